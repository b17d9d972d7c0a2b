use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Issue,
    PullRequest,
    Comment,
    Review,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Issue => "issue",
            EntityKind::PullRequest => "pull_request",
            EntityKind::Comment => "comment",
            EntityKind::Review => "review",
        }
    }

    /// Wire field carrying the entity identifier.
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Issue | EntityKind::PullRequest => "number",
            EntityKind::Comment | EntityKind::Review => "id",
        }
    }

    /// Wire field carrying the creation timestamp.
    pub fn created_field(&self) -> &'static str {
        match self {
            EntityKind::Review => "submitted_at",
            _ => "created_at",
        }
    }

    pub fn is_issue_like(&self) -> bool {
        matches!(self, EntityKind::Issue | EntityKind::PullRequest)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Open,
    Closed,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Open => "open",
            EntityState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequestDetails {
    pub changed_files: u64,
    pub additions: u64,
    pub deletions: u64,
    pub merged: bool,
    pub draft: bool,
    pub base_branch: String,
    pub head_branch: String,
    pub review_comment_count: u64,
}

impl PullRequestDetails {
    pub fn review_state(&self) -> &'static str {
        if self.merged {
            "merged"
        } else if self.draft {
            "draft"
        } else {
            "pending"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetails {
    Issue,
    PullRequest(PullRequestDetails),
    Comment {
        /// Number of the issue or pull request the comment belongs to.
        parent_id: Option<i64>,
    },
    Review {
        parent_id: Option<i64>,
        state: String,
    },
}

/// A validated issue, pull request, comment or review.
///
/// `closed_at`, when present, is never earlier than `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntity {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub author: String,
    pub labels: BTreeSet<String>,
    pub details: EntityDetails,
}

impl ActivityEntity {
    pub fn kind(&self) -> EntityKind {
        match self.details {
            EntityDetails::Issue => EntityKind::Issue,
            EntityDetails::PullRequest(_) => EntityKind::PullRequest,
            EntityDetails::Comment { .. } => EntityKind::Comment,
            EntityDetails::Review { .. } => EntityKind::Review,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn state(&self) -> EntityState {
        if self.is_open() {
            EntityState::Open
        } else {
            EntityState::Closed
        }
    }

    /// Whole days from creation to close, truncated.
    pub fn open_duration_days(&self) -> Option<i64> {
        self.closed_at
            .map(|closed| (closed - self.created_at).num_days())
    }

    /// `YYYY-MM` of creation.
    pub fn creation_month(&self) -> String {
        self.created_at.format("%Y-%m").to_string()
    }

    pub fn creation_hour(&self) -> u32 {
        self.created_at.hour()
    }

    pub fn pull_request(&self) -> Option<&PullRequestDetails> {
        match &self.details {
            EntityDetails::PullRequest(details) => Some(details),
            _ => None,
        }
    }

    pub fn parent_id(&self) -> Option<i64> {
        match &self.details {
            EntityDetails::Comment { parent_id } | EntityDetails::Review { parent_id, .. } => {
                *parent_id
            }
            _ => None,
        }
    }

    /// `merged`/`draft`/`pending` for pull requests, the submitted state for reviews.
    pub fn review_state(&self) -> Option<&str> {
        match &self.details {
            EntityDetails::PullRequest(details) => Some(details.review_state()),
            EntityDetails::Review { state, .. } => Some(state.as_str()),
            _ => None,
        }
    }
}

/// One entry of the commit history listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    /// Account login when GitHub could link one, else the git author name.
    pub author: String,
    pub authored_at: DateTime<Utc>,
}

impl CommitRecord {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    pub fn authored_month(&self) -> String {
        self.authored_at.format("%Y-%m").to_string()
    }
}

/// A repository contributor and their commit count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contributor {
    pub login: String,
    pub contributions: u64,
}
