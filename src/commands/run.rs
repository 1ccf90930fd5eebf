//! Run command implementation: fetch, merge, render.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::emit;
use crate::aggregator::Aggregator;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::recovery::{SourceReport, SourceState};
use crate::stats::log_summary;

/// Run the run command
pub async fn run(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::resolve(config_path).context("Failed to load configuration")?;
    config.apply_run_args(&args);

    // Every configuration error surfaces before the first request
    config.validate_run()?;
    let filter = config.filter_config()?;
    let formatter = config.formatter()?;
    let policy = config.recovery_policy()?;
    let sources = config.select_sources()?;
    let fetcher = Fetcher::new()?;

    info!("Merging {} sources...", sources.len());

    let mut aggregator = Aggregator::new(filter);
    let reports = policy.ingest_all(&sources, &fetcher, &mut aggregator).await;
    log_reports(&reports);

    let (collection, stats) = aggregator.into_parts();
    log_summary(&stats, &collection);

    emit(formatter.as_ref(), &collection, config.output.path.as_deref())
}

fn log_reports(reports: &[SourceReport]) {
    info!("Sources:");
    for report in reports {
        info!("  {:<18} {:<14} {}", report.id, report.state, report.stats);
    }

    let skipped = reports
        .iter()
        .filter(|r| matches!(r.state, SourceState::SkippedWithWarning { .. }))
        .count();
    if skipped == reports.len() {
        warn!("No source could be fetched or recovered; output is empty");
    } else if skipped > 0 {
        warn!("{} of {} sources skipped", skipped, reports.len());
    }
}
