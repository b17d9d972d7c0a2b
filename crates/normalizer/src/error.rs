use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", content = "detail", rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    WrongType { expected: &'static str },
    BadTimestamp { value: String },
    ClosedBeforeCreated,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldProblem::Missing => f.write_str("is missing"),
            FieldProblem::WrongType { expected } => write!(f, "is not {expected}"),
            FieldProblem::BadTimestamp { value } => {
                write!(f, "has non YYYY-MM-DDTHH:MM:SSZ value {value:?}")
            }
            FieldProblem::ClosedBeforeCreated => f.write_str("is earlier than the creation time"),
        }
    }
}

/// A record that could not become an entity. Recoverable: the caller skips it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("malformed {kind} record{}: `{field}` {problem}", display_id(.id))]
pub struct MalformedRecord {
    /// `issue`, `pull_request`, `comment`, `review`, `commit` or `contributor`.
    pub kind: &'static str,
    /// Identifier of the record, when it was itself readable.
    pub id: Option<i64>,
    pub field: &'static str,
    pub problem: FieldProblem,
}

fn display_id(id: &Option<i64>) -> String {
    id.map(|id| format!(" #{id}")).unwrap_or_default()
}
