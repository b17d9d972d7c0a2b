pub mod config;
pub mod errors;
pub mod logging;
pub mod text;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};

/// One JSON object from one page of a collection endpoint.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;
