//! Typed client for the jaye backend.
//!
//! Every read goes through the [`Interceptor`], so call sites only ever name the
//! endpoint path. The direct media links (`video_url`, `audio_url`) are plain
//! strings meant for a browser or [`crate::media::MediaSaver`].

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::transport::{ApiRequest, HttpTransport, Interceptor, Transport};
use crate::types::{envelope_message, response_message, Envelope, VideoInfo};

pub struct ApiClient {
    transport: Box<dyn Transport>,
    base: String,
    service: String,
}

impl ApiClient {
    /// Client over a real HTTP transport.
    pub fn new(cfg: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(cfg, HttpTransport::new(cfg)?))
    }

    /// Client over any transport; the interceptor is always layered on top.
    pub fn with_transport<T: Transport + 'static>(cfg: &ClientConfig, inner: T) -> Self {
        Self {
            transport: Box::new(Interceptor::new(cfg.api_endpoint.clone(), inner)),
            base: cfg.api_endpoint.clone(),
            service: cfg.service.clone(),
        }
    }

    /// Candidate ids for a free-text query. An empty query, or one containing a
    /// recognizable video id, resolves locally without touching the network.
    pub async fn search(&self, query: &str) -> Result<Vec<String>, ApiError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(id) = find_id(query) {
            tracing::debug!(id, "query carries a video id, skipping remote search");
            return Ok(vec![id.to_string()]);
        }
        let path = format!("/search?service={}&q={}", self.service, encode(query));
        // the backend encodes an empty result as `null`
        let ids: Option<Vec<String>> = self.get(&path).await?;
        Ok(ids.unwrap_or_default())
    }

    pub async fn info(&self, id: &str) -> Result<VideoInfo, ApiError> {
        self.get(&format!("/info?service={}&id={}", self.service, encode(id))).await
    }

    /// Ask the backend to fetch the video; resolves once it is stored.
    pub async fn video(&self, id: &str) -> Result<VideoInfo, ApiError> {
        self.get(&format!("/video?service={}&id={}", self.service, encode(id))).await
    }

    pub async fn list(&self) -> Result<Vec<VideoInfo>, ApiError> {
        let videos: Option<Vec<VideoInfo>> = self.get(&format!("/list?service={}", self.service)).await?;
        Ok(videos.unwrap_or_default())
    }

    pub fn video_url(&self, id: &str) -> String {
        format!("{}/video?service={}&id={}", self.base, self.service, encode(id))
    }

    pub fn audio_url(&self, id: &str) -> String {
        format!("{}/audio?service={}&id={}", self.base, self.service, encode(id))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.transport.send(ApiRequest::get(path)).await?;
        let url = format!("{}{}", self.base, path);
        if !resp.is_success() {
            let message = envelope_message(&resp.body)
                .unwrap_or_else(|| String::from_utf8_lossy(&resp.body).trim().to_string());
            return Err(ApiError::Status { url, status: resp.status, message });
        }
        // `success: false` comes with a message instead of the payload, so the
        // flag is checked before the payload is decoded into `T`.
        let env: Envelope<serde_json::Value> = serde_json::from_slice(&resp.body)
            .map_err(|source| ApiError::Decode { url: url.clone(), source })?;
        if !env.success {
            let message = response_message(&env.response).unwrap_or_default();
            return Err(ApiError::Rejected { url, message });
        }
        serde_json::from_value(env.response).map_err(|source| ApiError::Decode { url, source })
    }
}

fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|=|/)([0-9A-Za-z_-]{11})(?:/|&|$|\?|#)").expect("id pattern compiles")
    })
}

fn find_id(text: &str) -> Option<&str> {
    id_pattern().captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Extract an 11 character video id from a URL or text; empty when there is none.
pub fn id_from_url(text: &str) -> String {
    find_id(text).unwrap_or_default().to_string()
}
