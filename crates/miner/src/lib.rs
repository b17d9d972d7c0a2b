pub mod metrics;
pub mod report;
pub mod service;

pub use report::{ClassifiedCommit, ClassifiedEntity, MiningReport, RunSummary, SkippedRecord};
pub use service::{Collection, Miner, MiningJob};
