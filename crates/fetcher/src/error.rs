use http::StatusCode;
use thiserror::Error;

/// Terminal outcome of a fetch. Every variant aborts the current collection walk.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited on {target} after {attempts} attempts")]
    RateLimited { target: String, attempts: u32 },
    #[error("network failure on {target} after {attempts} attempts: {source}")]
    Transient {
        target: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("github api error: {status} for {target}: {message}")]
    Client {
        target: String,
        status: StatusCode,
        message: String,
    },
    #[error("unexpected payload from {target}: {reason}")]
    InvalidPayload { target: String, reason: String },
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    /// Short machine label, used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Transient { .. } => "transient",
            FetchError::Client { .. } => "client_error",
            FetchError::InvalidPayload { .. } => "invalid_payload",
            FetchError::Request(_) | FetchError::Endpoint(_) => "request",
        }
    }
}
