use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use normalizer::{ActivityEntity, CommitRecord, Contributor};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::classify::{Classification, CommitKind};

/// Axis a frequency table is kept for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Kind,
    State,
    Author,
    Label,
    BugType,
    Component,
    Severity,
    Priority,
    BaseBranch,
    HeadBranch,
    ReviewState,
    Parent,
    Hour,
    CommitKind,
    /// Weighted by each contributor's commit count.
    Contributor,
}

impl Dimension {
    pub const ALL: [Dimension; 15] = [
        Dimension::Kind,
        Dimension::State,
        Dimension::Author,
        Dimension::Label,
        Dimension::BugType,
        Dimension::Component,
        Dimension::Severity,
        Dimension::Priority,
        Dimension::BaseBranch,
        Dimension::HeadBranch,
        Dimension::ReviewState,
        Dimension::Parent,
        Dimension::Hour,
        Dimension::CommitKind,
        Dimension::Contributor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Kind => "kind",
            Dimension::State => "state",
            Dimension::Author => "author",
            Dimension::Label => "label",
            Dimension::BugType => "bug_type",
            Dimension::Component => "component",
            Dimension::Severity => "severity",
            Dimension::Priority => "priority",
            Dimension::BaseBranch => "base_branch",
            Dimension::HeadBranch => "head_branch",
            Dimension::ReviewState => "review_state",
            Dimension::Parent => "parent",
            Dimension::Hour => "hour",
            Dimension::CommitKind => "commit_kind",
            Dimension::Contributor => "contributor",
        }
    }
}

/// Key counts that remember the order keys were first seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, count: u64) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += count,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), count));
            }
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Keys in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// `n` highest counts, descending. Ties keep first-seen order.
    pub fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked = self.entries.clone();
        // sort_by is stable, so equal counts stay in insertion order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Order-free view, handy for comparing tables.
    pub fn to_counts(&self) -> BTreeMap<String, u64> {
        self.entries.iter().cloned().collect()
    }

    fn merge(&mut self, other: &FrequencyTable) {
        for (key, count) in other.iter() {
            self.add(key, count);
        }
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Running sums over pull request size fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestTotals {
    pub count: u64,
    pub changed_files: u64,
    pub additions: u64,
    pub deletions: u64,
    pub review_comments: u64,
    pub merged: u64,
    pub draft: u64,
}

impl PullRequestTotals {
    fn merge(&mut self, other: &PullRequestTotals) {
        self.count += other.count;
        self.changed_files += other.changed_files;
        self.additions += other.additions;
        self.deletions += other.deletions;
        self.review_comments += other.review_comments;
        self.merged += other.merged;
        self.draft += other.draft;
    }
}

/// Per-run accumulator. Folding is order independent: any permutation of the
/// same entities yields the same counts, sums and durations multiset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStats {
    total: u64,
    tables: BTreeMap<Dimension, FrequencyTable>,
    created_by_month: BTreeMap<String, u64>,
    closed_by_month: BTreeMap<String, u64>,
    durations: Vec<i64>,
    pull_requests: PullRequestTotals,
    /// Creation times of pull requests still open.
    open_pull_requests: Vec<DateTime<Utc>>,
    reproducible: u64,
    contributions: u64,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, entity: &ActivityEntity, classification: Option<&Classification>) {
        self.total += 1;
        self.bump(Dimension::Kind, entity.kind().as_str());
        self.bump(Dimension::State, entity.state().as_str());
        self.bump(Dimension::Author, &entity.author);
        for label in &entity.labels {
            self.bump(Dimension::Label, label);
        }

        if let Some(tags) = classification {
            self.bump(Dimension::BugType, tags.bug_type.as_str());
            self.bump(Dimension::Component, tags.component.as_str());
            self.bump(Dimension::Severity, tags.severity.as_str());
            self.bump(Dimension::Priority, tags.priority.as_str());
            if tags.has_reproduction {
                self.reproducible += 1;
            }
        }

        if let Some(pr) = entity.pull_request() {
            if !pr.base_branch.is_empty() {
                self.bump(Dimension::BaseBranch, &pr.base_branch);
            }
            if !pr.head_branch.is_empty() {
                self.bump(Dimension::HeadBranch, &pr.head_branch);
            }
            let totals = &mut self.pull_requests;
            totals.count += 1;
            totals.changed_files += pr.changed_files;
            totals.additions += pr.additions;
            totals.deletions += pr.deletions;
            totals.review_comments += pr.review_comment_count;
            totals.merged += u64::from(pr.merged);
            totals.draft += u64::from(pr.draft);
            if entity.is_open() {
                self.open_pull_requests.push(entity.created_at);
            }
        }
        if let Some(state) = entity.review_state() {
            self.bump(Dimension::ReviewState, state);
        }
        if let Some(parent) = entity.parent_id() {
            self.bump(Dimension::Parent, &parent.to_string());
        }
        if entity.kind() == normalizer::EntityKind::Comment {
            self.bump(Dimension::Hour, &format!("{:02}", entity.creation_hour()));
        }

        let month = entity.creation_month();
        *self.created_by_month.entry(month.clone()).or_default() += 1;
        if let Some(days) = entity.open_duration_days() {
            self.durations.push(days);
            *self.closed_by_month.entry(month).or_default() += 1;
        }
    }

    pub fn fold_commit(&mut self, commit: &CommitRecord, kind: CommitKind) {
        self.total += 1;
        self.bump(Dimension::Kind, "commit");
        self.bump(Dimension::Author, &commit.author);
        self.bump(Dimension::CommitKind, kind.as_str());
        *self
            .created_by_month
            .entry(commit.authored_month())
            .or_default() += 1;
    }

    pub fn fold_contributor(&mut self, contributor: &Contributor) {
        self.total += 1;
        self.bump(Dimension::Kind, "contributor");
        self.tables
            .entry(Dimension::Contributor)
            .or_default()
            .add(&contributor.login, contributor.contributions);
        self.contributions += contributor.contributions;
    }

    /// Folds another run's stats into this one. Keys new to `self` are appended
    /// in `other`'s first-seen order.
    pub fn merge(&mut self, other: &AggregateStats) {
        self.total += other.total;
        for (dimension, table) in &other.tables {
            self.tables.entry(*dimension).or_default().merge(table);
        }
        for (month, count) in &other.created_by_month {
            *self.created_by_month.entry(month.clone()).or_default() += count;
        }
        for (month, count) in &other.closed_by_month {
            *self.closed_by_month.entry(month.clone()).or_default() += count;
        }
        self.durations.extend_from_slice(&other.durations);
        self.pull_requests.merge(&other.pull_requests);
        self.open_pull_requests
            .extend_from_slice(&other.open_pull_requests);
        self.reproducible += other.reproducible;
        self.contributions += other.contributions;
    }

    fn bump(&mut self, dimension: Dimension, key: &str) {
        self.tables.entry(dimension).or_default().increment(key);
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn table(&self, dimension: Dimension) -> Option<&FrequencyTable> {
        self.tables.get(&dimension)
    }

    pub fn count(&self, dimension: Dimension, key: &str) -> u64 {
        self.table(dimension).map(|t| t.get(key)).unwrap_or(0)
    }

    pub fn top_n(&self, dimension: Dimension, n: usize) -> Vec<(String, u64)> {
        self.table(dimension)
            .map(|t| t.top_n(n))
            .unwrap_or_default()
    }

    pub fn open_count(&self) -> u64 {
        self.count(Dimension::State, "open")
    }

    pub fn closed_count(&self) -> u64 {
        self.count(Dimension::State, "closed")
    }

    /// Mean whole days from creation to close; `0.0` with nothing closed.
    pub fn mean_duration(&self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        self.durations.iter().sum::<i64>() as f64 / self.durations.len() as f64
    }

    pub fn max_duration(&self) -> Option<i64> {
        self.durations.iter().copied().max()
    }

    pub fn durations(&self) -> &[i64] {
        &self.durations
    }

    pub fn created_by_month(&self) -> &BTreeMap<String, u64> {
        &self.created_by_month
    }

    pub fn closed_by_month(&self) -> &BTreeMap<String, u64> {
        &self.closed_by_month
    }

    pub fn pull_requests(&self) -> &PullRequestTotals {
        &self.pull_requests
    }

    pub fn reproducible(&self) -> u64 {
        self.reproducible
    }

    /// Sum of contributor commit counts.
    pub fn contributions(&self) -> u64 {
        self.contributions
    }

    /// Whole days each open pull request has been waiting as of `now`, in
    /// fold order. Creation times after `now` count as zero.
    pub fn open_pull_request_ages(&self, now: DateTime<Utc>) -> Vec<i64> {
        self.open_pull_requests
            .iter()
            .map(|created| (now - *created).num_days().max(0))
            .collect()
    }

    pub fn mean_open_pull_request_age(&self, now: DateTime<Utc>) -> f64 {
        let ages = self.open_pull_request_ages(now);
        if ages.is_empty() {
            return 0.0;
        }
        ages.iter().sum::<i64>() as f64 / ages.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_n_breaks_ties_by_first_seen() {
        let mut table = FrequencyTable::default();
        for key in ["b", "a", "c", "a", "c"] {
            table.increment(key);
        }
        assert_eq!(
            table.top_n(3),
            vec![("a".to_string(), 2), ("c".to_string(), 2), ("b".to_string(), 1)]
        );
        assert_eq!(table.top_n(1).len(), 1);
        assert_eq!(table.total(), 5);
    }

    #[test]
    fn missing_keys_count_zero() {
        let stats = AggregateStats::new();
        assert_eq!(stats.count(Dimension::Author, "nobody"), 0);
        assert!(stats.top_n(Dimension::Label, 5).is_empty());
        assert_eq!(stats.mean_duration(), 0.0);
        assert_eq!(stats.max_duration(), None);
    }

    #[test]
    fn contributors_weigh_by_commit_count() {
        let mut stats = AggregateStats::new();
        for (login, contributions) in [("ada", 40), ("bob", 2), ("cy", 40)] {
            stats.fold_contributor(&Contributor {
                login: login.into(),
                contributions,
            });
        }
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.contributions(), 82);
        assert_eq!(
            stats.top_n(Dimension::Contributor, 2),
            vec![("ada".to_string(), 40), ("cy".to_string(), 40)]
        );
    }

    #[test]
    fn table_serializes_in_first_seen_order() {
        let mut table = FrequencyTable::default();
        table.add("zeta", 2);
        table.add("alpha", 1);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"zeta":2,"alpha":1}"#);
    }
}
