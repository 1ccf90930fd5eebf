//! Per-source fetch with snapshot fallback.
//!
//! Each source goes `Fetching -> Success | Failed`, and a failed source goes
//! on to `RecoveredFromSnapshot | SkippedWithWarning`. No outcome here is
//! fatal: a source that cannot be fetched or recovered is logged and left
//! out, and the run continues with the next one.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::error::{ConfigError, FetchError};
use crate::fetcher::Fetcher;
use crate::prefix::Prefix;
use crate::snapshot::SnapshotStore;
use crate::sources::Source;
use crate::stats::Stats;

/// Upper bound for one source's `load`, on top of the HTTP request timeout
/// (retries included).
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Final state of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    Fetched,
    RecoveredFromSnapshot,
    SkippedWithWarning { reason: String },
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::Fetched => f.pad("fetched"),
            SourceState::RecoveredFromSnapshot => f.pad("from snapshot"),
            SourceState::SkippedWithWarning { .. } => f.pad("skipped"),
        }
    }
}

/// What one source contributed to the run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub id: String,
    pub state: SourceState,
    /// Counters for this source's entries only.
    pub stats: Stats,
}

pub struct RecoveryPolicy {
    store: Option<SnapshotStore>,
    recover: bool,
    fetch_timeout: Duration,
}

impl RecoveryPolicy {
    /// Snapshots are written when a directory is given; `recover` enables
    /// reading them back after a failed fetch and requires the directory.
    pub fn new(snapshot_dir: Option<PathBuf>, recover: bool) -> Result<Self, ConfigError> {
        Self::with_store(snapshot_dir.map(SnapshotStore::new), recover)
    }

    pub fn with_store(store: Option<SnapshotStore>, recover: bool) -> Result<Self, ConfigError> {
        if recover && store.is_none() {
            return Err(ConfigError::RecoveryWithoutSnapshotDir);
        }
        Ok(Self {
            store,
            recover,
            fetch_timeout: FETCH_TIMEOUT,
        })
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Process every source in order.
    pub async fn ingest_all(
        &self,
        sources: &[Box<dyn Source>],
        fetcher: &Fetcher,
        aggregator: &mut Aggregator,
    ) -> Vec<SourceReport> {
        let mut reports = Vec::with_capacity(sources.len());
        for source in sources {
            reports.push(self.ingest(source.as_ref(), fetcher, aggregator).await);
        }
        reports
    }

    /// Fetch one source and feed it to the aggregator, falling back to its
    /// snapshot when the fetch fails.
    pub async fn ingest(
        &self,
        source: &dyn Source,
        fetcher: &Fetcher,
        aggregator: &mut Aggregator,
    ) -> SourceReport {
        let id = source.id().to_string();

        match self.fetch(source, fetcher).await {
            Ok(entries) => {
                let stats = aggregator.add_all(&entries, &id);
                info!("{}: {}", id, stats);
                if entries.is_empty() {
                    warn!("{}: feed is empty, previous snapshot kept", id);
                } else {
                    self.persist(source, &entries);
                }
                SourceReport {
                    id,
                    state: SourceState::Fetched,
                    stats,
                }
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", id, e);
                self.recover(source, aggregator)
            }
        }
    }

    /// A body with entries but not a single prefix among them (an HTML
    /// error page, say) counts as a failed fetch.
    async fn fetch(&self, source: &dyn Source, fetcher: &Fetcher) -> Result<Vec<String>, FetchError> {
        let entries = match tokio::time::timeout(self.fetch_timeout, source.load(fetcher)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    source_id: source.id().to_string(),
                    seconds: self.fetch_timeout.as_secs(),
                })
            }
        };

        if !entries.is_empty() && !entries.iter().any(|e| Prefix::parse(e).is_ok()) {
            return Err(FetchError::Parse {
                source_id: source.id().to_string(),
                message: format!("none of {} entries is an IP prefix", entries.len()),
            });
        }
        Ok(entries)
    }

    /// Best effort: a failed save only warns.
    fn persist(&self, source: &dyn Source, entries: &[String]) {
        let Some(store) = &self.store else {
            return;
        };
        match source.save_snapshot(store, entries) {
            Ok(count) => info!(
                "Saved snapshot for {} ({} prefixes) to {:?}",
                source.id(),
                count,
                store.path_for(source.id())
            ),
            Err(e) => warn!("Could not save snapshot for {}: {}", source.id(), e),
        }
    }

    fn recover(&self, source: &dyn Source, aggregator: &mut Aggregator) -> SourceReport {
        let id = source.id().to_string();
        let skipped = |reason: String| {
            warn!("Skipping {}: {}", id, reason);
            SourceReport {
                id: id.clone(),
                state: SourceState::SkippedWithWarning { reason },
                stats: Stats::default(),
            }
        };

        let store = match &self.store {
            Some(store) if self.recover => store,
            _ => return skipped("snapshot recovery is disabled".to_string()),
        };

        if !store.exists(&id) {
            return skipped(format!("no snapshot at {:?}", store.path_for(&id)));
        }

        match source.load_from_snapshot(store) {
            Ok(entries) => {
                let stats = aggregator.add_all(&entries, &id);
                warn!(
                    "{}: using snapshot {:?} ({})",
                    id,
                    store.path_for(&id),
                    stats
                );
                SourceReport {
                    id: source.id().to_string(),
                    state: SourceState::RecoveredFromSnapshot,
                    stats,
                }
            }
            Err(e) => skipped(e.to_string()),
        }
    }
}
