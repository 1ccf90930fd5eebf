//! CLI command implementations.

pub mod formats;
pub mod replay;
pub mod run;
pub mod sources;

use anyhow::{Context, Result};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::aggregator::Collection;
use crate::error::RenderError;
use crate::fs_abstraction::{FileSystem, RealFileSystem};
use crate::output::Formatter;
use crate::utils::format_bytes;

/// Render the collection to `path` (replaced atomically) or to stdout.
pub fn emit(formatter: &dyn Formatter, collection: &Collection, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut buffer = Vec::new();
            formatter.render(collection, &mut buffer)?;
            RealFileSystem
                .write_atomic(path, &buffer)
                .with_context(|| format!("Failed to write output file {:?}", path))?;
            info!(
                "Wrote {} output ({}) to {:?}",
                formatter.id(),
                format_bytes(buffer.len() as u64),
                path
            );
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            formatter.render(collection, &mut out)?;
            out.flush().map_err(RenderError::from)?;
        }
    }
    Ok(())
}
