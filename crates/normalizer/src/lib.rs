pub mod error;
pub mod models;
pub mod payloads;
pub mod transform;

pub use error::{FieldProblem, MalformedRecord};
pub use models::{
    ActivityEntity, CommitRecord, Contributor, EntityDetails, EntityKind, EntityState,
    PullRequestDetails,
};
pub use transform::{
    parse, parse_batch, parse_batch_with, parse_commit, parse_contributor, BatchReport,
};
