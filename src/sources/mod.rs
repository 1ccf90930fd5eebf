//! Blocklist source adapters.
//!
//! Each adapter turns one remote feed into raw prefix strings. Adapters do
//! not validate entries; the aggregator does, so malformed lines are counted.
//! Sources are registered statically and selected by identifier.

mod dshield;
mod netset;
mod spamhaus;

use async_trait::async_trait;
use tracing::debug;

pub use dshield::{parse_dshield, DshieldSource};
pub use netset::{parse_netset, NetsetSource};
pub use spamhaus::{parse_drop_json, SpamhausDropSource};

use crate::error::{ConfigError, FetchError, PersistError, RecoveryError};
use crate::fetcher::Fetcher;
use crate::snapshot::SnapshotStore;

/// Capability set of one blocklist feed.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable short identifier, used for provenance and snapshot file names.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Whether the source is selected when no explicit list is given.
    fn used_by_default(&self) -> bool;

    /// Fetch the live feed and return its raw entries.
    async fn load(&self, fetcher: &Fetcher) -> Result<Vec<String>, FetchError>;

    /// Read the entries saved by the last successful fetch.
    fn load_from_snapshot(&self, store: &SnapshotStore) -> Result<Vec<String>, RecoveryError> {
        store.load(self.id())
    }

    /// Save freshly fetched entries for future recovery.
    fn save_snapshot(&self, store: &SnapshotStore, entries: &[String]) -> Result<usize, PersistError> {
        store.save(self.id(), entries)
    }
}

/// Every source known to ipmerge, in default processing order.
pub fn all_sources() -> Vec<Box<dyn Source>> {
    vec![
        Box::new(NetsetSource::new(
            "firehol_level1",
            "FireHOL Level 1",
            "https://iplists.firehol.org/files/firehol_level1.netset",
            true,
        )),
        Box::new(NetsetSource::new(
            "firehol_level2",
            "FireHOL Level 2",
            "https://iplists.firehol.org/files/firehol_level2.netset",
            false,
        )),
        Box::new(NetsetSource::new(
            "firehol_level3",
            "FireHOL Level 3",
            "https://iplists.firehol.org/files/firehol_level3.netset",
            false,
        )),
        Box::new(SpamhausDropSource::new(
            "spamhaus_drop",
            "Spamhaus DROP (IPv4)",
            "https://www.spamhaus.org/drop/drop_v4.json",
        )),
        Box::new(SpamhausDropSource::new(
            "spamhaus_dropv6",
            "Spamhaus DROP (IPv6)",
            "https://www.spamhaus.org/drop/drop_v6.json",
        )),
        Box::new(DshieldSource::new()),
        Box::new(NetsetSource::new(
            "blocklist_de",
            "blocklist.de all attackers",
            "https://lists.blocklist.de/lists/all.txt",
            false,
        )),
    ]
}

/// Resolve the sources to process.
///
/// Starts from `explicit` (or every default source when `None`), appends
/// `include`, then removes `exclude`. Order is preserved and each source
/// appears once. Unknown identifiers and an empty result are errors.
pub fn select_sources(
    explicit: Option<&[String]>,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<Box<dyn Source>>, ConfigError> {
    let mut available = all_sources();

    for id in explicit.unwrap_or(&[]).iter().chain(include).chain(exclude) {
        if !available.iter().any(|s| s.id() == id) {
            return Err(ConfigError::UnknownSource(id.clone()));
        }
    }

    let mut wanted: Vec<String> = match explicit {
        Some(ids) => ids.to_vec(),
        None => available
            .iter()
            .filter(|s| s.used_by_default())
            .map(|s| s.id().to_string())
            .collect(),
    };
    wanted.extend(include.iter().cloned());
    wanted.retain(|id| !exclude.contains(id));

    let mut selected: Vec<Box<dyn Source>> = Vec::new();
    for id in wanted {
        if selected.iter().any(|s| s.id() == id) {
            continue;
        }
        if let Some(pos) = available.iter().position(|s| s.id() == id) {
            selected.push(available.remove(pos));
        }
    }

    if selected.is_empty() {
        return Err(ConfigError::NoSources);
    }

    debug!(
        "Selected sources: {}",
        selected.iter().map(|s| s.id()).collect::<Vec<_>>().join(", ")
    );
    Ok(selected)
}
