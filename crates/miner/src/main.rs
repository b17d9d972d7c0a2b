use anyhow::Result;
use chrono::Utc;
use common::{config::AppConfig, logging, AppError};
use fetcher::{PageFetcher, RetryPolicy};
use miner::{Miner, MiningJob};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;
    let job = MiningJob::from_config(&config.miner)?;

    let fetcher = PageFetcher::builder(config.github.user_agent.clone())
        .api_base(config.github.api_base.clone())
        .token(config.github.token.clone())
        .page_size(config.fetch.page_size)
        .policy(RetryPolicy::from_config(&config.fetch))
        .build()
        .map_err(AppError::http)?;
    let miner = Miner::new(fetcher).with_pr_details(config.miner.fetch_pr_details);

    info!(
        owner = %job.owner,
        repo = %job.repo,
        collection = job.collection.as_str(),
        "miner started"
    );
    let report = miner.run(&job).await;
    let summary = report.summary(config.miner.top_n, Utc::now());

    info!(
        total = summary.total,
        open = summary.open,
        closed = summary.closed,
        skipped = summary.skipped,
        mean_fix_days = summary.mean_fix_days,
        max_fix_days = ?summary.max_fix_days,
        reproducible = summary.reproducible,
        mean_open_pr_age_days = summary.mean_open_pr_age_days,
        contributions = summary.contributions,
        "run summary"
    );
    for (dimension, ranked) in &summary.top {
        info!(dimension = dimension.as_str(), top = ?ranked, "top values");
    }
    if let Some(err) = &report.terminal_error {
        warn!(error = %err, "run ended early; summary covers the pages fetched before the failure");
    }
    Ok(())
}
