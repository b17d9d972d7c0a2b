pub mod aggregate;
pub mod classify;
pub mod keywords;

pub use aggregate::{AggregateStats, Dimension, FrequencyTable, PullRequestTotals};
pub use classify::{
    classify, classify_commit_message, classify_entity, BugType, Classification, CommitKind,
    Component, Priority, Severity,
};
