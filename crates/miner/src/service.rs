use std::time::Instant;

use analysis::{classify_commit_message, classify_entity};
use common::config::MinerConfig;
use common::{AppError, RawRecord};
use fetcher::{FetchError, Page, PageFetcher};
use futures::{pin_mut, StreamExt};
use normalizer::{
    parse_batch, parse_batch_with, parse_commit, parse_contributor, EntityKind, MalformedRecord,
};
use tracing::{debug, info, instrument, warn};

use crate::metrics;
use crate::report::{ClassifiedCommit, ClassifiedEntity, MiningReport, SkippedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Issues,
    PullRequests,
    IssueComments,
    /// Reviews of one pull request, or of every listed pull request.
    Reviews { pull_number: Option<u64> },
    Commits,
    Contributors,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Issues => "issues",
            Collection::PullRequests => "pulls",
            Collection::IssueComments => "comments",
            Collection::Reviews { .. } => "reviews",
            Collection::Commits => "commits",
            Collection::Contributors => "contributors",
        }
    }

    /// The entity kind parsed from the listing; `None` for commits and contributors.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Collection::Issues => Some(EntityKind::Issue),
            Collection::PullRequests => Some(EntityKind::PullRequest),
            Collection::IssueComments => Some(EntityKind::Comment),
            Collection::Reviews { .. } => Some(EntityKind::Review),
            Collection::Commits | Collection::Contributors => None,
        }
    }

    fn record_label(&self) -> &'static str {
        match self {
            Collection::Commits => "commit",
            Collection::Contributors => "contributor",
            other => other.entity_kind().map_or("unknown", |kind| kind.as_str()),
        }
    }
}

/// One repository collection to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningJob {
    pub owner: String,
    pub repo: String,
    pub collection: Collection,
    /// `open`, `closed` or `all`.
    pub state: String,
    /// Comma separated label filter, issues only.
    pub labels: Option<String>,
}

impl MiningJob {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, collection: Collection) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            collection,
            state: "all".to_string(),
            labels: None,
        }
    }

    pub fn from_config(config: &MinerConfig) -> common::Result<Self> {
        if config.owner.trim().is_empty() || config.repo.trim().is_empty() {
            return Err(AppError::invalid_job("owner and repo must be set"));
        }
        let collection = match config.collection.to_ascii_lowercase().as_str() {
            "issues" => Collection::Issues,
            "pulls" | "pull_requests" => Collection::PullRequests,
            "comments" | "issue_comments" => Collection::IssueComments,
            "reviews" => Collection::Reviews {
                pull_number: config.pull_number,
            },
            "commits" => Collection::Commits,
            "contributors" => Collection::Contributors,
            other => {
                return Err(AppError::invalid_job(format!(
                    "unknown collection `{other}`"
                )))
            }
        };
        let state = config.state.to_ascii_lowercase();
        if !matches!(state.as_str(), "open" | "closed" | "all") {
            return Err(AppError::invalid_job(format!(
                "state must be open, closed or all, got `{}`",
                config.state
            )));
        }
        Ok(Self {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            collection,
            state,
            labels: config.labels.clone().filter(|labels| !labels.is_empty()),
        })
    }

    /// The listing the run walks. For reviews of every pull request this is
    /// the pull request listing.
    pub fn endpoint(&self) -> String {
        let base = format!("repos/{}/{}", self.owner, self.repo);
        match self.collection {
            Collection::Issues => format!("{base}/issues"),
            Collection::PullRequests | Collection::Reviews { pull_number: None } => {
                format!("{base}/pulls")
            }
            Collection::IssueComments => format!("{base}/issues/comments"),
            Collection::Reviews {
                pull_number: Some(number),
            } => self.reviews_endpoint(number),
            Collection::Commits => format!("{base}/commits"),
            Collection::Contributors => format!("{base}/contributors"),
        }
    }

    /// Filters understood by the listing; paging is added by the fetcher.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if matches!(
            self.collection,
            Collection::Issues
                | Collection::PullRequests
                | Collection::Reviews { pull_number: None }
        ) {
            params.push(("state".to_string(), self.state.clone()));
        }
        if let (Collection::Issues, Some(labels)) = (self.collection, &self.labels) {
            params.push(("labels".to_string(), labels.clone()));
        }
        params
    }

    pub fn reviews_endpoint(&self, pull_number: u64) -> String {
        format!(
            "repos/{}/{}/pulls/{pull_number}/reviews",
            self.owner, self.repo
        )
    }

    fn pull_endpoint(&self, number: i64) -> String {
        format!("repos/{}/{}/pulls/{number}", self.owner, self.repo)
    }
}

/// Runs fetch, parse, classify and fold over one collection.
pub struct Miner {
    fetcher: PageFetcher,
    fetch_pr_details: bool,
}

impl Miner {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            fetch_pr_details: false,
        }
    }

    /// Re-fetch each listed pull request for its size fields.
    pub fn with_pr_details(mut self, enabled: bool) -> Self {
        self.fetch_pr_details = enabled;
        self
    }

    /// Never fails as a whole: a fetch error ends the walk and is kept in
    /// [`MiningReport::terminal_error`] next to everything gathered so far.
    #[instrument(
        skip(self, job),
        fields(owner = %job.owner, repo = %job.repo, collection = job.collection.as_str())
    )]
    pub async fn run(&self, job: &MiningJob) -> MiningReport {
        let started = Instant::now();
        let mut report = MiningReport::default();

        match job.collection {
            Collection::Reviews { pull_number: None } => {
                self.walk_all_reviews(job, &mut report).await
            }
            _ => {
                self.walk(job, &job.endpoint(), job.query_params(), &mut report)
                    .await;
            }
        }

        let outcome = if report.is_complete() { "complete" } else { "partial" };
        metrics::RUNS_TOTAL.with_label_values(&[outcome]).inc();
        metrics::RUN_DURATION.observe(started.elapsed().as_secs_f64());
        info!(
            outcome,
            pages = report.pages,
            entities = report.entities.len(),
            commits = report.commits.len(),
            contributors = report.contributors.len(),
            skipped = report.skipped.len(),
            filtered = report.filtered,
            "mining run finished"
        );
        report
    }

    /// Walks one listing to its end. Returns `false` when a fetch error ended it.
    async fn walk(
        &self,
        job: &MiningJob,
        endpoint: &str,
        params: Vec<(String, String)>,
        report: &mut MiningReport,
    ) -> bool {
        let pages = self.fetcher.fetch_all(endpoint, params);
        pin_mut!(pages);

        while let Some(next) = pages.next().await {
            let page = match next {
                Ok(page) => page,
                Err(err) => {
                    stop(report, err);
                    return false;
                }
            };
            report.pages += 1;
            if let Err(err) = self.absorb(job, page, report).await {
                stop(report, err);
                return false;
            }
        }
        true
    }

    /// Lists pull requests and walks the reviews of each one in turn.
    async fn walk_all_reviews(&self, job: &MiningJob, report: &mut MiningReport) {
        let pulls = self.fetcher.fetch_all(&job.endpoint(), job.query_params());
        pin_mut!(pulls);

        while let Some(next) = pulls.next().await {
            let page = match next {
                Ok(page) => page,
                Err(err) => {
                    stop(report, err);
                    return;
                }
            };
            report.pages += 1;
            for raw in &page.records {
                let Some(number) = raw.get("number").and_then(|value| value.as_u64()) else {
                    warn!(page = page.number, "listed pull request has no number, skipping");
                    continue;
                };
                self.fetcher.throttle().await;
                let endpoint = job.reviews_endpoint(number);
                if !self.walk(job, &endpoint, Vec::new(), report).await {
                    return;
                }
                debug!(pull = number, total = report.stats.total(), "reviews folded");
            }
        }
    }

    async fn absorb(
        &self,
        job: &MiningJob,
        page: Page,
        report: &mut MiningReport,
    ) -> Result<(), FetchError> {
        let number = page.number;
        let label = job.collection.record_label();
        let mut records = page.records;

        match job.collection {
            Collection::Issues => {
                let before = records.len();
                records.retain(|raw| !raw.contains_key("pull_request"));
                report.filtered += (before - records.len()) as u64;
            }
            Collection::PullRequests if self.fetch_pr_details => {
                records = self.enrich(job, records).await.map_err(|err| {
                    warn!(error = %err, page = number, "pull request detail fetch failed");
                    err
                })?;
            }
            _ => {}
        }

        match job.collection.entity_kind() {
            Some(kind) => {
                let batch = parse_batch(records, kind);
                note_skipped(report, number, label, batch.skipped);
                note_parsed(label, batch.entities.len());
                for entity in batch.entities {
                    let classification = classify_entity(&entity);
                    report.stats.fold(&entity, classification.as_ref());
                    report.entities.push(ClassifiedEntity {
                        entity,
                        classification,
                    });
                }
            }
            None if job.collection == Collection::Commits => {
                let batch = parse_batch_with(records, parse_commit);
                note_skipped(report, number, label, batch.skipped);
                note_parsed(label, batch.entities.len());
                for commit in batch.entities {
                    let kind = classify_commit_message(&commit.message);
                    report.stats.fold_commit(&commit, kind);
                    report.commits.push(ClassifiedCommit { commit, kind });
                }
            }
            None => {
                let batch = parse_batch_with(records, parse_contributor);
                note_skipped(report, number, label, batch.skipped);
                note_parsed(label, batch.entities.len());
                for contributor in batch.entities {
                    report.stats.fold_contributor(&contributor);
                    report.contributors.push(contributor);
                }
            }
        }
        debug!(page = number, total = report.stats.total(), "page folded");
        Ok(())
    }

    /// Swaps each list item for its detail record. Items without a readable
    /// number are passed through so the parser can reject them.
    async fn enrich(
        &self,
        job: &MiningJob,
        records: Vec<RawRecord>,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let mut enriched = Vec::with_capacity(records.len());
        for raw in records {
            match raw.get("number").and_then(|value| value.as_i64()) {
                Some(number) => {
                    let detail = self.fetcher.fetch_one(&job.pull_endpoint(number)).await?;
                    enriched.push(detail);
                }
                None => enriched.push(raw),
            }
        }
        Ok(enriched)
    }
}

fn stop(report: &mut MiningReport, err: FetchError) {
    warn!(
        error = %err,
        kind = err.kind(),
        pages = report.pages,
        "fetch failed, keeping partial results"
    );
    report.terminal_error = Some(err);
}

fn note_skipped(report: &mut MiningReport, page: u32, label: &str, skipped: Vec<MalformedRecord>) {
    for err in skipped {
        warn!(page, id = ?err.id, error = %err, "skipping malformed record");
        metrics::RECORDS_SKIPPED_TOTAL
            .with_label_values(&[label])
            .inc();
        report.skipped.push(SkippedRecord::new(page, &err));
    }
}

fn note_parsed(label: &str, count: usize) {
    metrics::RECORDS_PARSED_TOTAL
        .with_label_values(&[label])
        .inc_by(count as u64);
}
