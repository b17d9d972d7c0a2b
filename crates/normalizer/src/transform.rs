use common::RawRecord;
use serde::Serialize;
use tracing::debug;

use crate::error::{FieldProblem, MalformedRecord};
use crate::models::{
    ActivityEntity, CommitRecord, Contributor, EntityDetails, EntityKind, PullRequestDetails,
};
use crate::payloads::{FieldResult, RecordView};

/// Converts one raw record into a typed entity of the given kind.
pub fn parse(raw: RawRecord, kind: EntityKind) -> Result<ActivityEntity, MalformedRecord> {
    let view = RecordView::new(&raw);
    parse_view(&view, kind).map_err(|(field, problem)| MalformedRecord {
        kind: kind.as_str(),
        id: view.peek_i64(kind.id_field()),
        field,
        problem,
    })
}

fn parse_view(view: &RecordView<'_>, kind: EntityKind) -> FieldResult<ActivityEntity> {
    let id = view.required_i64(kind.id_field())?;
    let created_at = view.required_timestamp(kind.created_field())?;
    let author = view.author()?;

    let closed_at = match kind {
        EntityKind::Issue | EntityKind::PullRequest => view.optional_timestamp("closed_at")?,
        EntityKind::Comment | EntityKind::Review => None,
    };
    if matches!(closed_at, Some(closed) if closed < created_at) {
        return Err(("closed_at", FieldProblem::ClosedBeforeCreated));
    }

    let details = match kind {
        EntityKind::Issue => EntityDetails::Issue,
        EntityKind::PullRequest => EntityDetails::PullRequest(pull_request_details(view)?),
        EntityKind::Comment => EntityDetails::Comment {
            parent_id: match view.url_number("issue_url")? {
                Some(number) => Some(number),
                None => view.url_number("pull_request_url")?,
            },
        },
        EntityKind::Review => EntityDetails::Review {
            parent_id: view.url_number("pull_request_url")?,
            state: view.text("state")?,
        },
    };

    Ok(ActivityEntity {
        id,
        title: view.text("title")?,
        body: view.text("body")?,
        created_at,
        closed_at,
        author,
        labels: view.labels()?,
        details,
    })
}

fn pull_request_details(view: &RecordView<'_>) -> FieldResult<PullRequestDetails> {
    // List endpoints only carry `merged_at`; the detail endpoint adds `merged`.
    let merged = view.optional_bool("merged")? || view.optional_str("merged_at")?.is_some();
    Ok(PullRequestDetails {
        changed_files: view.optional_u64("changed_files")?,
        additions: view.optional_u64("additions")?,
        deletions: view.optional_u64("deletions")?,
        merged,
        draft: view.optional_bool("draft")?,
        base_branch: view.branch("base")?,
        head_branch: view.branch("head")?,
        review_comment_count: view.optional_u64("review_comments")?,
    })
}

/// Converts one entry of `repos/{owner}/{repo}/commits`.
pub fn parse_commit(raw: RawRecord) -> Result<CommitRecord, MalformedRecord> {
    let view = RecordView::new(&raw);
    commit_view(&view).map_err(|(field, problem)| MalformedRecord {
        kind: "commit",
        id: None,
        field,
        problem,
    })
}

fn commit_view(view: &RecordView<'_>) -> FieldResult<CommitRecord> {
    let sha = view
        .optional_str("sha")?
        .filter(|sha| !sha.is_empty())
        .ok_or(("sha", FieldProblem::Missing))?
        .to_string();
    let commit = view
        .nested("commit")?
        .ok_or(("commit", FieldProblem::Missing))?;
    let message = commit.text("message").map_err(at("commit.message"))?;
    let signature = commit
        .nested("author")
        .map_err(at("commit.author"))?
        .ok_or(("commit.author", FieldProblem::Missing))?;
    let authored_at = signature
        .required_timestamp("date")
        .map_err(at("commit.author.date"))?;

    // `author` is null when the commit email maps to no account.
    let login = match view.nested("author")? {
        Some(user) => user.optional_str("login").map_err(at("author.login"))?,
        None => None,
    };
    let author = match login.filter(|login| !login.is_empty()) {
        Some(login) => login.to_string(),
        None => signature
            .optional_str("name")
            .map_err(at("commit.author.name"))?
            .filter(|name| !name.is_empty())
            .ok_or(("author", FieldProblem::Missing))?
            .to_string(),
    };

    Ok(CommitRecord {
        sha,
        message,
        author,
        authored_at,
    })
}

/// Converts one entry of `repos/{owner}/{repo}/contributors`.
pub fn parse_contributor(raw: RawRecord) -> Result<Contributor, MalformedRecord> {
    let view = RecordView::new(&raw);
    contributor_view(&view).map_err(|(field, problem)| MalformedRecord {
        kind: "contributor",
        id: view.peek_i64("id"),
        field,
        problem,
    })
}

fn contributor_view(view: &RecordView<'_>) -> FieldResult<Contributor> {
    let login = view
        .optional_str("login")?
        .filter(|login| !login.is_empty())
        .ok_or(("login", FieldProblem::Missing))?;
    Ok(Contributor {
        login: login.to_string(),
        contributions: view.required_u64("contributions")?,
    })
}

/// Renames the failing field of a nested view to its dotted path.
fn at(path: &'static str) -> impl Fn((&'static str, FieldProblem)) -> (&'static str, FieldProblem) {
    move |(_, problem)| (path, problem)
}

/// Per-record outcome of one page, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T = ActivityEntity> {
    pub entities: Vec<T>,
    pub skipped: Vec<MalformedRecord>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn len(&self) -> usize {
        self.entities.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses every record; a malformed record never stops the rest of the batch.
pub fn parse_batch(records: Vec<RawRecord>, kind: EntityKind) -> BatchReport {
    parse_batch_with(records, |raw| parse(raw, kind))
}

/// [`parse_batch`] with any record parser, e.g. [`parse_commit`].
pub fn parse_batch_with<T, F>(records: Vec<RawRecord>, parse_one: F) -> BatchReport<T>
where
    F: Fn(RawRecord) -> Result<T, MalformedRecord>,
{
    let mut report = BatchReport::default();
    for raw in records {
        match parse_one(raw) {
            Ok(entity) => report.entities.push(entity),
            Err(err) => {
                debug!(error = %err, "skipping record");
                report.skipped.push(err);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixtures are objects"),
        }
    }

    fn issue(number: i64) -> Value {
        json!({
            "id": 9_000 + number,
            "number": number,
            "title": "Crash on start",
            "body": "Steps to reproduce: run it",
            "state": "closed",
            "created_at": "2024-01-01T00:00:00Z",
            "closed_at": "2024-01-11T00:00:00Z",
            "user": {"login": "octocat", "id": 1},
            "labels": [{"name": "bug"}, {"name": "priority: high"}],
            "comments": 2
        })
    }

    #[test]
    fn issue_parses_with_number_as_id() {
        let entity = parse(record(issue(42)), EntityKind::Issue).expect("valid issue");
        assert_eq!(entity.id, 42);
        assert_eq!(entity.author, "octocat");
        assert_eq!(entity.kind(), EntityKind::Issue);
        assert!(entity.labels.contains("bug"));
        assert_eq!(entity.open_duration_days(), Some(10));
    }

    #[test]
    fn missing_body_and_null_closed_at_are_fine() {
        let mut value = issue(1);
        value.as_object_mut().unwrap().remove("body");
        value["closed_at"] = Value::Null;
        let entity = parse(record(value), EntityKind::Issue).expect("valid issue");
        assert_eq!(entity.body, "");
        assert!(entity.is_open());
    }

    #[test]
    fn missing_created_at_reports_id() {
        let mut value = issue(3);
        value.as_object_mut().unwrap().remove("created_at");
        let err = parse(record(value), EntityKind::Issue).unwrap_err();
        assert_eq!(err.id, Some(3));
        assert_eq!(err.field, "created_at");
        assert_eq!(err.problem, FieldProblem::Missing);
        assert_eq!(
            err.to_string(),
            "malformed issue record #3: `created_at` is missing"
        );
    }

    #[test]
    fn missing_id_reports_no_id() {
        let mut value = issue(3);
        value.as_object_mut().unwrap().remove("number");
        let err = parse(record(value), EntityKind::Issue).unwrap_err();
        assert_eq!(err.id, None);
        assert_eq!(err.field, "number");
    }

    #[test]
    fn timestamp_with_offset_is_malformed() {
        let mut value = issue(5);
        value["closed_at"] = json!("2024-01-11T00:00:00+08:00");
        let err = parse(record(value), EntityKind::Issue).unwrap_err();
        assert_eq!(err.field, "closed_at");
        assert!(matches!(err.problem, FieldProblem::BadTimestamp { .. }));
    }

    #[test]
    fn closed_before_created_is_malformed() {
        let mut value = issue(6);
        value["closed_at"] = json!("2023-12-31T23:59:59Z");
        let err = parse(record(value), EntityKind::Issue).unwrap_err();
        assert_eq!(err.problem, FieldProblem::ClosedBeforeCreated);
    }

    #[test]
    fn null_user_is_malformed() {
        let mut value = issue(7);
        value["user"] = Value::Null;
        let err = parse(record(value), EntityKind::Issue).unwrap_err();
        assert_eq!(err.field, "user");
    }

    #[test]
    fn pull_request_list_item_uses_merged_at() {
        let value = json!({
            "number": 12,
            "title": "Add cache",
            "body": null,
            "created_at": "2024-03-01T10:00:00Z",
            "closed_at": "2024-03-02T10:00:00Z",
            "merged_at": "2024-03-02T10:00:00Z",
            "user": {"login": "dev"},
            "labels": [],
            "draft": false,
            "base": {"ref": "main"},
            "head": {"ref": "feature/cache"}
        });
        let entity = parse(record(value), EntityKind::PullRequest).expect("valid pr");
        let details = entity.pull_request().expect("pr details");
        assert!(details.merged);
        assert_eq!(details.base_branch, "main");
        assert_eq!(details.head_branch, "feature/cache");
        assert_eq!(details.additions, 0);
        assert_eq!(entity.review_state(), Some("merged"));
    }

    #[test]
    fn pull_request_detail_sizes() {
        let value = json!({
            "number": 13,
            "created_at": "2024-03-01T10:00:00Z",
            "user": {"login": "dev"},
            "merged": false,
            "draft": true,
            "changed_files": 4,
            "additions": 120,
            "deletions": 30,
            "review_comments": 6
        });
        let entity = parse(record(value), EntityKind::PullRequest).expect("valid pr");
        let details = entity.pull_request().unwrap();
        assert_eq!(
            (details.changed_files, details.additions, details.deletions),
            (4, 120, 30)
        );
        assert_eq!(details.review_comment_count, 6);
        assert_eq!(entity.review_state(), Some("draft"));
    }

    #[test]
    fn comment_points_back_to_issue() {
        let value = json!({
            "id": 555,
            "issue_url": "https://api.github.com/repos/o/r/issues/42",
            "user": {"login": "reviewer"},
            "created_at": "2024-02-02T13:00:00Z",
            "body": "LGTM"
        });
        let entity = parse(record(value), EntityKind::Comment).expect("valid comment");
        assert_eq!(entity.id, 555);
        assert_eq!(entity.parent_id(), Some(42));
        assert_eq!(entity.title, "");
        assert_eq!(entity.creation_hour(), 13);
    }

    #[test]
    fn review_uses_submitted_at() {
        let value = json!({
            "id": 77,
            "user": {"login": "maintainer"},
            "state": "APPROVED",
            "submitted_at": "2024-02-03T08:00:00Z",
            "pull_request_url": "https://api.github.com/repos/o/r/pulls/12"
        });
        let entity = parse(record(value), EntityKind::Review).expect("valid review");
        assert_eq!(entity.parent_id(), Some(12));
        assert_eq!(entity.review_state(), Some("APPROVED"));
    }

    fn commit(sha: &str, login: Option<&str>) -> Value {
        json!({
            "sha": sha,
            "commit": {
                "message": "Fix crash in parser\n\nCloses #4",
                "author": {"name": "Ada Lovelace", "date": "2024-04-02T09:30:00Z"}
            },
            "author": login.map(|login| json!({"login": login}))
        })
    }

    #[test]
    fn commit_prefers_account_login() {
        let parsed = parse_commit(record(commit("a1", Some("ada")))).expect("valid commit");
        assert_eq!(parsed.author, "ada");
        assert_eq!(parsed.summary(), "Fix crash in parser");
        assert_eq!(parsed.authored_month(), "2024-04");
    }

    #[test]
    fn unlinked_commit_falls_back_to_git_name() {
        let parsed = parse_commit(record(commit("b2", None))).expect("valid commit");
        assert_eq!(parsed.author, "Ada Lovelace");
    }

    #[test]
    fn commit_without_date_names_the_path() {
        let mut value = commit("c3", Some("ada"));
        value["commit"]["author"]
            .as_object_mut()
            .unwrap()
            .remove("date");
        let err = parse_commit(record(value)).unwrap_err();
        assert_eq!(err.kind, "commit");
        assert_eq!(err.field, "commit.author.date");
        assert_eq!(
            err.to_string(),
            "malformed commit record: `commit.author.date` is missing"
        );
    }

    #[test]
    fn contributor_needs_a_count() {
        let ok = parse_contributor(record(json!({"login": "ada", "id": 1, "contributions": 40})))
            .expect("valid contributor");
        assert_eq!(ok.contributions, 40);

        let err = parse_contributor(record(json!({"login": "bob", "id": 2, "contributions": -1})))
            .unwrap_err();
        assert_eq!(err.id, Some(2));
        assert_eq!(err.field, "contributions");
    }

    #[test]
    fn batch_isolates_bad_records() {
        let mut records: Vec<RawRecord> = (1..=5).map(|n| record(issue(n))).collect();
        records[2].remove("created_at");

        let report = parse_batch(records, EntityKind::Issue);
        assert_eq!(report.entities.len(), 4);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, Some(3));
        assert_eq!(
            report.entities.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2, 4, 5]
        );
    }
}
