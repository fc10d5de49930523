use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// An outgoing GET request. `url` is a path relative to the API base until the
/// [`Interceptor`] has rewritten it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), headers: Vec::new() }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value under the same (case-insensitive) name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(t) = cfg.timeout() {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut rb = self.client.get(&req.url);
        for (k, v) in &req.headers {
            rb = rb.header(k.as_str(), v.as_str());
        }
        let transport_err = |e: reqwest::Error| ApiError::Transport { url: req.url.clone(), message: e.to_string() };
        let resp = rb.send().await.map_err(transport_err)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(transport_err)?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

/// Rewrites every request before it reaches the wrapped transport: the API base
/// URL is prefixed and `Accept: application/json` is set. There is no per-call opt-out.
pub struct Interceptor<T> {
    base: String,
    inner: T,
}

impl<T: Transport> Interceptor<T> {
    pub fn new(base: impl Into<String>, inner: T) -> Self {
        Self { base: base.into(), inner }
    }

    pub fn rewrite(&self, mut req: ApiRequest) -> ApiRequest {
        req.url = format!("{}{}", self.base, req.url);
        req.set_header("Accept", "application/json");
        req
    }
}

#[async_trait]
impl<T: Transport> Transport for Interceptor<T> {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
        let req = self.rewrite(req);
        tracing::trace!(url = %req.url, "GET");
        self.inner.send(req).await
    }
}
