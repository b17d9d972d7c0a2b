use std::collections::BTreeMap;

use analysis::{AggregateStats, Classification, CommitKind, Dimension};
use chrono::{DateTime, Utc};
use fetcher::FetchError;
use normalizer::{ActivityEntity, CommitRecord, Contributor, MalformedRecord};
use serde::{Serialize, Serializer};

/// A parsed entity with its tags. Comments and reviews carry no classification.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEntity {
    pub entity: ActivityEntity,
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedCommit {
    pub commit: CommitRecord,
    pub kind: CommitKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub page: u32,
    pub id: Option<i64>,
    pub reason: String,
}

impl SkippedRecord {
    pub fn new(page: u32, err: &MalformedRecord) -> Self {
        Self {
            page,
            id: err.id,
            reason: err.to_string(),
        }
    }
}

/// Everything one run produced. Kept intact when the run ends early.
#[derive(Debug, Default, Serialize)]
pub struct MiningReport {
    pub stats: AggregateStats,
    pub entities: Vec<ClassifiedEntity>,
    pub commits: Vec<ClassifiedCommit>,
    pub contributors: Vec<Contributor>,
    pub skipped: Vec<SkippedRecord>,
    /// Pull requests dropped from the issues listing.
    pub filtered: u64,
    pub pages: u32,
    #[serde(serialize_with = "serialize_error")]
    pub terminal_error: Option<FetchError>,
}

impl MiningReport {
    pub fn is_complete(&self) -> bool {
        self.terminal_error.is_none()
    }

    /// Open pull request ages are measured against `now`.
    pub fn summary(&self, top_n: usize, now: DateTime<Utc>) -> RunSummary {
        let top = Dimension::ALL
            .into_iter()
            .filter_map(|dimension| {
                let ranked = self.stats.top_n(dimension, top_n);
                (!ranked.is_empty()).then_some((dimension, ranked))
            })
            .collect();
        RunSummary {
            total: self.stats.total(),
            open: self.stats.open_count(),
            closed: self.stats.closed_count(),
            skipped: self.skipped.len(),
            mean_fix_days: self.stats.mean_duration(),
            max_fix_days: self.stats.max_duration(),
            reproducible: self.stats.reproducible(),
            mean_open_pr_age_days: self.stats.mean_open_pull_request_age(now),
            contributions: self.stats.contributions(),
            complete: self.is_complete(),
            top,
        }
    }
}

/// The read-only numbers a report writer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: u64,
    pub open: u64,
    pub closed: u64,
    pub skipped: usize,
    pub mean_fix_days: f64,
    pub max_fix_days: Option<i64>,
    pub reproducible: u64,
    pub mean_open_pr_age_days: f64,
    pub contributions: u64,
    pub complete: bool,
    pub top: BTreeMap<Dimension, Vec<(String, u64)>>,
}

fn serialize_error<S: Serializer>(
    error: &Option<FetchError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}
