pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid job: {0}")]
    InvalidJob(String),
    /// The HTTP client could not be set up.
    #[error("http error: {0}")]
    Http(#[source] anyhow::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn http(err: impl Into<anyhow::Error>) -> Self {
        Self::Http(err.into())
    }

    pub fn invalid_job(reason: impl Into<String>) -> Self {
        Self::InvalidJob(reason.into())
    }
}
