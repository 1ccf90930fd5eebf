//! Replay command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::emit;
use crate::aggregator::replay;
use crate::cli::{FilterArgs, OutputArgs};
use crate::config::Config;
use crate::snapshot::BatchDocument;
use crate::stats::log_summary;
use crate::utils::format_count;

/// Re-run a batch document through the current filters and render it.
/// An unreadable input file is fatal.
pub fn run(
    input: &Path,
    filters: &FilterArgs,
    output: &OutputArgs,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::resolve(config_path).context("Failed to load configuration")?;
    config.apply_filter_args(filters);
    config.apply_output_args(output);
    config.validate()?;

    let filter = config.filter_config()?;
    let formatter = config.formatter()?;

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read batch document {:?}", input))?;
    let document = BatchDocument::from_json(&content)
        .with_context(|| format!("Failed to parse batch document {:?}", input))?;

    info!(
        "Replaying {} entries from {:?}",
        format_count(document.len() as u64),
        input
    );

    let (collection, stats) = replay(&document, filter);
    log_summary(&stats, &collection);

    emit(formatter.as_ref(), &collection, config.output.path.as_deref())
}
