use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use common::RawRecord;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FieldProblem;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LabelPayload {
    Named { name: String },
    Plain(String),
}

impl LabelPayload {
    pub fn into_name(self) -> String {
        match self {
            LabelPayload::Named { name } | LabelPayload::Plain(name) => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

pub type FieldResult<T> = Result<T, (&'static str, FieldProblem)>;

/// Typed, field-by-field access to a raw record. Every failure names the field.
#[derive(Debug)]
pub struct RecordView<'a> {
    raw: &'a RawRecord,
}

impl<'a> RecordView<'a> {
    pub fn new(raw: &'a RawRecord) -> Self {
        Self { raw }
    }

    /// Absent and JSON `null` are the same thing on the wire.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.raw.get(field).filter(|value| !value.is_null())
    }

    pub fn required_i64(&self, field: &'static str) -> FieldResult<i64> {
        let value = self.present(field).ok_or((field, FieldProblem::Missing))?;
        value
            .as_i64()
            .ok_or((field, FieldProblem::WrongType { expected: "an integer" }))
    }

    pub fn required_u64(&self, field: &'static str) -> FieldResult<u64> {
        let value = self.present(field).ok_or((field, FieldProblem::Missing))?;
        value
            .as_u64()
            .ok_or((field, FieldProblem::WrongType { expected: "a non-negative integer" }))
    }

    pub fn optional_u64(&self, field: &'static str) -> FieldResult<u64> {
        match self.present(field) {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .ok_or((field, FieldProblem::WrongType { expected: "a non-negative integer" })),
        }
    }

    pub fn optional_bool(&self, field: &'static str) -> FieldResult<bool> {
        match self.present(field) {
            None => Ok(false),
            Some(value) => value
                .as_bool()
                .ok_or((field, FieldProblem::WrongType { expected: "a boolean" })),
        }
    }

    pub fn optional_str(&self, field: &'static str) -> FieldResult<Option<&'a str>> {
        match self.present(field) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or((field, FieldProblem::WrongType { expected: "a string" })),
        }
    }

    pub fn text(&self, field: &'static str) -> FieldResult<String> {
        Ok(self.optional_str(field)?.unwrap_or_default().to_string())
    }

    pub fn required_timestamp(&self, field: &'static str) -> FieldResult<DateTime<Utc>> {
        self.optional_timestamp(field)?
            .ok_or((field, FieldProblem::Missing))
    }

    pub fn optional_timestamp(&self, field: &'static str) -> FieldResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.optional_str(field)? else {
            return Ok(None);
        };
        parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| (field, FieldProblem::BadTimestamp { value: raw.to_string() }))
    }

    pub fn author(&self) -> FieldResult<String> {
        let value = self.present("user").ok_or(("user", FieldProblem::Missing))?;
        let user = UserRef::deserialize(value)
            .map_err(|_| ("user", FieldProblem::WrongType { expected: "an object with a login" }))?;
        if user.login.is_empty() {
            return Err(("user", FieldProblem::Missing));
        }
        Ok(user.login)
    }

    pub fn labels(&self) -> FieldResult<BTreeSet<String>> {
        let Some(value) = self.present("labels") else {
            return Ok(BTreeSet::new());
        };
        let labels = Vec::<LabelPayload>::deserialize(value)
            .map_err(|_| ("labels", FieldProblem::WrongType { expected: "an array of labels" }))?;
        Ok(labels
            .into_iter()
            .map(LabelPayload::into_name)
            .filter(|name| !name.is_empty())
            .collect())
    }

    pub fn branch(&self, field: &'static str) -> FieldResult<String> {
        match self.present(field) {
            None => Ok(String::new()),
            Some(value) => BranchRef::deserialize(value)
                .map(|branch| branch.name)
                .map_err(|_| (field, FieldProblem::WrongType { expected: "an object with a ref" })),
        }
    }

    /// View over a sub-object such as `commit` or `commit.author`.
    pub fn nested(&self, field: &'static str) -> FieldResult<Option<RecordView<'a>>> {
        match self.present(field) {
            None => Ok(None),
            Some(value) => value
                .as_object()
                .map(|raw| Some(RecordView::new(raw)))
                .ok_or((field, FieldProblem::WrongType { expected: "an object" })),
        }
    }

    /// Trailing number of an API url field such as `issue_url`.
    pub fn url_number(&self, field: &'static str) -> FieldResult<Option<i64>> {
        Ok(self
            .optional_str(field)?
            .and_then(common::text::trailing_number))
    }

    /// Best-effort identifier read used to label failures.
    pub fn peek_i64(&self, field: &str) -> Option<i64> {
        self.present(field).and_then(Value::as_i64)
    }
}

/// Strict `YYYY-MM-DDTHH:MM:SSZ`; offsets and fractional seconds are rejected.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != 20 {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn timestamp_format_is_exact() {
        assert!(parse_timestamp("2024-01-01T00:00:00Z").is_some());
        assert!(parse_timestamp("2024-01-01T00:00:00.123Z").is_none());
        assert!(parse_timestamp("2024-01-01T00:00:00+00:00").is_none());
        assert!(parse_timestamp("2024-01-01").is_none());
        assert!(parse_timestamp("2024-13-01T00:00:00Z").is_none());
    }

    #[test]
    fn labels_accept_objects_and_strings() {
        let raw = record(json!({"labels": [{"name": "bug"}, "P1", {"name": "bug"}]}));
        let labels = RecordView::new(&raw).labels().unwrap();
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec!["P1", "bug"]);
    }

    #[test]
    fn null_fields_read_as_absent() {
        let raw = record(json!({"body": null, "labels": null, "closed_at": null}));
        let view = RecordView::new(&raw);
        assert_eq!(view.text("body").unwrap(), "");
        assert!(view.labels().unwrap().is_empty());
        assert_eq!(view.optional_timestamp("closed_at").unwrap(), None);
    }

    #[test]
    fn nested_objects_read_like_records() {
        let raw = record(json!({"commit": {"author": {"name": "Ada"}}, "author": null, "sha": "abc"}));
        let view = RecordView::new(&raw);
        let commit = view.nested("commit").unwrap().expect("commit object");
        let signature = commit.nested("author").unwrap().expect("author object");
        assert_eq!(signature.optional_str("name").unwrap(), Some("Ada"));
        assert!(view.nested("author").unwrap().is_none());
        assert_eq!(view.nested("sha").unwrap_err().0, "sha");
    }

    #[test]
    fn user_without_login_is_rejected() {
        let raw = record(json!({"user": {"id": 3}}));
        let err = RecordView::new(&raw).author().unwrap_err();
        assert_eq!(err.0, "user");
    }
}
