use thiserror::Error;

/// Failure of a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network unreachable, connection reset, timeout.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Non-2xx answer. `message` is the envelope's payload when the body carried one.
    #[error("{url} answered {status}: {message}")]
    Status { url: String, status: u16, message: String },

    /// 2xx answer whose envelope reported `success: false`.
    #[error("{url} reported failure: {message}")]
    Rejected { url: String, message: String },

    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build http client: {0}")]
    Client(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
