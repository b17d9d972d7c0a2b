pub mod backoff;
pub mod error;
pub mod exec;
pub mod metrics;
pub mod model;
pub mod pager;

pub use backoff::RetryPolicy;
pub use error::FetchError;
pub use exec::{HttpExec, ReqwestExecutor};
pub use model::Page;
pub use pager::{PageFetcher, PageFetcherBuilder};
