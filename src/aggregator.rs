//! Aggregation engine: merges prefixes from many sources into one
//! deduplicated, order-stable collection that remembers where each prefix
//! came from.
//!
//! The engine holds no hidden state. [`add_entry`] takes the collection and
//! the counters explicitly, so a single call can be tested in isolation;
//! [`Aggregator`] bundles them for the common case of a full run.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::filter::FilterConfig;
use crate::prefix::{Family, Prefix};
use crate::snapshot::BatchDocument;
use crate::stats::{Outcome, Stats};
use crate::utils::{is_safe_name, truncate};

/// Longest accepted source identifier.
pub const MAX_SOURCE_ID_LEN: usize = 64;

/// Source identifier(s) attached to a raw entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTag {
    /// Live ingestion: the entry was reported by one source.
    SingleSource(String),
    /// Replay: the entry was already merged from several sources.
    SourceSet(BTreeSet<String>),
}

impl SourceTag {
    fn is_empty(&self) -> bool {
        match self {
            SourceTag::SingleSource(id) => id.is_empty(),
            SourceTag::SourceSet(ids) => ids.is_empty(),
        }
    }

    /// First identifier that is not a safe name, if any. Identifiers are
    /// rendered verbatim into scripts and CSV columns.
    fn invalid_id(&self) -> Option<&str> {
        match self {
            SourceTag::SingleSource(id) => {
                (!is_safe_name(id, MAX_SOURCE_ID_LEN)).then_some(id.as_str())
            }
            SourceTag::SourceSet(ids) => ids
                .iter()
                .map(String::as_str)
                .find(|id| !is_safe_name(id, MAX_SOURCE_ID_LEN)),
        }
    }

    fn into_set(self) -> BTreeSet<String> {
        match self {
            SourceTag::SingleSource(id) => BTreeSet::from([id]),
            SourceTag::SourceSet(ids) => ids,
        }
    }
}

/// A unique prefix and every source that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub prefix: Prefix,
    pub sources: BTreeSet<String>,
}

/// Ordered per-family entry lists plus a key index.
///
/// Entries appear in first-sighting order and are never removed. The index
/// maps each canonical key to its position in the family list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    ipv4: Vec<Entry>,
    ipv6: Vec<Entry>,
    index: HashMap<String, (Family, usize)>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        let (family, pos) = *self.index.get(key)?;
        self.entries(family).get(pos)
    }

    /// Entries of one family in first-sighting order.
    pub fn entries(&self, family: Family) -> &[Entry] {
        match family {
            Family::V4 => &self.ipv4,
            Family::V6 => &self.ipv6,
        }
    }

    /// All entries, IPv4 first.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.ipv4.iter().chain(self.ipv6.iter())
    }

    /// Total addresses covered by one family. Overlapping prefixes are
    /// counted once per prefix.
    pub fn address_count(&self, family: Family) -> u128 {
        self.entries(family)
            .iter()
            .map(|e| e.prefix.address_count())
            .fold(0u128, |acc, count| acc.saturating_add(count))
    }

    fn merge_sources(&mut self, key: &str, sources: BTreeSet<String>) {
        if let Some(&(family, pos)) = self.index.get(key) {
            let list = match family {
                Family::V4 => &mut self.ipv4,
                Family::V6 => &mut self.ipv6,
            };
            list[pos].sources.extend(sources);
        }
    }

    fn insert(&mut self, key: String, prefix: Prefix, sources: BTreeSet<String>) {
        let family = prefix.family();
        let list = match family {
            Family::V4 => &mut self.ipv4,
            Family::V6 => &mut self.ipv6,
        };
        list.push(Entry { prefix, sources });
        self.index.insert(key, (family, list.len() - 1));
    }
}

/// Feed one raw prefix through normalization, deduplication and filtering.
///
/// Increments exactly one counter in `stats`. Malformed input is logged and
/// reported as [`Outcome::Error`]; it never aborts the run. The duplicate
/// check runs before any filter, so filters only apply on first sighting.
pub fn add_entry(
    text: &str,
    sources: SourceTag,
    filter: &FilterConfig,
    collection: &mut Collection,
    stats: &mut Stats,
) -> Outcome {
    let outcome = classify(text, sources, filter, collection);
    stats.record(outcome);
    outcome
}

fn classify(
    text: &str,
    sources: SourceTag,
    filter: &FilterConfig,
    collection: &mut Collection,
) -> Outcome {
    let prefix = match Prefix::parse(text) {
        Ok(prefix) => prefix,
        Err(e) => {
            warn!("Skipping entry: {}", e);
            return Outcome::Error;
        }
    };

    if sources.is_empty() {
        warn!("Skipping entry '{}': no source identifier", text.trim());
        return Outcome::Error;
    }

    if let Some(id) = sources.invalid_id() {
        warn!(
            "Skipping entry '{}': invalid source identifier {:?}",
            prefix.key(),
            truncate(id, MAX_SOURCE_ID_LEN)
        );
        return Outcome::Error;
    }

    let key = prefix.key();
    let sources = sources.into_set();

    if collection.contains_key(&key) {
        collection.merge_sources(&key, sources);
        return Outcome::Duplicate;
    }

    if let Err(reason) = filter.check(&prefix) {
        debug!("Filtered {}: {}", key, reason);
        return Outcome::Filtered;
    }

    collection.insert(key, prefix, sources);
    Outcome::Accepted
}

/// Owns the filter configuration, the collection and the counters for one
/// run.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    filter: FilterConfig,
    collection: Collection,
    stats: Stats,
}

impl Aggregator {
    pub fn new(filter: FilterConfig) -> Self {
        Self {
            filter,
            collection: Collection::new(),
            stats: Stats::default(),
        }
    }

    pub fn add_entry(&mut self, text: &str, sources: SourceTag) -> Outcome {
        add_entry(
            text,
            sources,
            &self.filter,
            &mut self.collection,
            &mut self.stats,
        )
    }

    /// Feed every entry reported by one source. Returns the counters for
    /// this batch only.
    pub fn add_all<I, S>(&mut self, entries: I, source_id: &str) -> Stats
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = Stats::default();
        for entry in entries {
            let outcome = self.add_entry(
                entry.as_ref(),
                SourceTag::SingleSource(source_id.to_string()),
            );
            batch.record(outcome);
        }
        batch
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn into_parts(self) -> (Collection, Stats) {
        (self.collection, self.stats)
    }
}

/// Rebuild a collection from a previously emitted batch document.
///
/// Every entry goes through [`add_entry`] with its merged source set, so it
/// is revalidated against the current filter configuration.
pub fn replay(document: &BatchDocument, filter: FilterConfig) -> (Collection, Stats) {
    let mut aggregator = Aggregator::new(filter);
    for (prefix, sources) in document.entries() {
        aggregator.add_entry(prefix, SourceTag::SourceSet(sources.clone()));
    }
    aggregator.into_parts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FamilyRestriction;

    fn single(id: &str) -> SourceTag {
        SourceTag::SingleSource(id.to_string())
    }

    fn set(ids: &[&str]) -> SourceTag {
        SourceTag::SourceSet(ids.iter().map(|s| s.to_string()).collect())
    }

    fn sources(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_entry_accepts_new_prefix() {
        let filter = FilterConfig::default();
        let mut collection = Collection::new();
        let mut stats = Stats::default();

        let outcome = add_entry("1.2.3.0/24", single("a"), &filter, &mut collection, &mut stats);

        assert_eq!(outcome, Outcome::Accepted);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("1.2.3.0/24").unwrap().sources, sources(&["a"]));
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.total(), 1);
    }

    #[test]
    fn test_canonicalization_merges_sources() {
        let mut agg = Aggregator::default();

        assert_eq!(agg.add_entry("10.0.0.1/8", single("a")), Outcome::Accepted);
        assert_eq!(agg.add_entry("10.0.0.0/8", single("b")), Outcome::Duplicate);

        let collection = agg.collection();
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.get("10.0.0.0/8").unwrap().sources,
            sources(&["a", "b"])
        );
        assert_eq!(agg.stats().accepted, 1);
        assert_eq!(agg.stats().duplicate, 1);
    }

    #[test]
    fn test_same_source_twice_is_idempotent() {
        let mut agg = Aggregator::default();
        let entries = ["1.1.1.0/24", "2.2.2.0/24", "2001:db8::/32"];

        let first = agg.add_all(entries, "src");
        let snapshot = agg.collection().clone();
        let second = agg.add_all(entries, "src");

        assert_eq!(first.accepted, 3);
        assert_eq!(
            second,
            Stats {
                duplicate: 3,
                ..Default::default()
            }
        );
        assert_eq!(agg.collection(), &snapshot);
    }

    #[test]
    fn test_malformed_input_only_touches_error_counter() {
        let mut agg = Aggregator::default();
        agg.add_entry("1.2.3.0/24", single("a"));
        let before = agg.collection().clone();

        assert_eq!(agg.add_entry("not-a-prefix", single("a")), Outcome::Error);

        assert_eq!(agg.collection(), &before);
        assert_eq!(
            *agg.stats(),
            Stats {
                accepted: 1,
                error: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_empty_source_set_is_error() {
        let mut agg = Aggregator::default();
        assert_eq!(agg.add_entry("1.2.3.0/24", set(&[])), Outcome::Error);
        assert!(agg.collection().is_empty());
        assert_eq!(agg.stats().error, 1);
    }

    #[test]
    fn test_unsafe_source_id_is_error() {
        let mut agg = Aggregator::default();
        agg.add_entry("1.2.3.0/24", single("a"));
        let long = "x".repeat(MAX_SOURCE_ID_LEN + 1);

        for id in ["x\"\ndestroy other-set\n#", "a,b", "a b", long.as_str()] {
            assert_eq!(agg.add_entry("5.6.7.0/24", single(id)), Outcome::Error, "{:?}", id);
        }
        // One bad id poisons the whole set, even for a known prefix
        assert_eq!(agg.add_entry("1.2.3.0/24", set(&["b", "c;d"])), Outcome::Error);

        assert_eq!(agg.collection().len(), 1);
        assert_eq!(agg.collection().get("1.2.3.0/24").unwrap().sources, sources(&["a"]));
        assert_eq!(agg.stats().error, 5);
    }

    #[test]
    fn test_duplicate_check_precedes_filters() {
        let filter = FilterConfig {
            ipv4_min_len: 24,
            ..Default::default()
        };
        let mut collection = Collection::new();
        let mut stats = Stats::default();

        // Accepted under a permissive filter first
        add_entry(
            "10.0.0.0/16",
            single("a"),
            &FilterConfig::default(),
            &mut collection,
            &mut stats,
        );
        // A later sighting under a stricter filter still merges
        let outcome = add_entry("10.0.0.0/16", single("b"), &filter, &mut collection, &mut stats);

        assert_eq!(outcome, Outcome::Duplicate);
        assert_eq!(
            collection.get("10.0.0.0/16").unwrap().sources,
            sources(&["a", "b"])
        );
    }

    #[test]
    fn test_filtered_prefix_is_not_recorded() {
        let mut agg = Aggregator::new(FilterConfig {
            ipv4_min_len: 24,
            ..Default::default()
        });
        assert_eq!(agg.add_entry("10.0.0.0/16", single("a")), Outcome::Filtered);
        assert_eq!(agg.add_entry("10.0.0.0/24", single("a")), Outcome::Accepted);
        // Filtered prefixes are re-evaluated on each sighting
        assert_eq!(agg.add_entry("10.0.0.0/16", single("b")), Outcome::Filtered);
        assert!(!agg.collection().contains_key("10.0.0.0/16"));
        assert_eq!(agg.stats().filtered, 2);
    }

    #[test]
    fn test_family_restriction() {
        let mut v4 = Aggregator::new(FilterConfig {
            family: FamilyRestriction::Ipv4Only,
            ..Default::default()
        });
        assert_eq!(v4.add_entry("2a00::/16", single("a")), Outcome::Filtered);
        assert_eq!(v4.add_entry("1.0.0.0/24", single("a")), Outcome::Accepted);

        let mut v6 = Aggregator::new(FilterConfig {
            family: FamilyRestriction::Ipv6Only,
            ..Default::default()
        });
        assert_eq!(v6.add_entry("1.0.0.0/24", single("a")), Outcome::Filtered);
        assert_eq!(v6.add_entry("2a00::/16", single("a")), Outcome::Accepted);
    }

    #[test]
    fn test_exclusion_list() {
        let mut agg = Aggregator::new(FilterConfig {
            exclude: vec!["FE80::/10".parse().unwrap()],
            ..Default::default()
        });
        assert_eq!(agg.add_entry("FE80::1/128", single("a")), Outcome::Filtered);
        assert_eq!(agg.add_entry("FE81::/16", single("a")), Outcome::Filtered);
        assert_eq!(agg.add_entry("FE70::/16", single("a")), Outcome::Accepted);
    }

    #[test]
    fn test_first_sighting_order_per_family() {
        let mut agg = Aggregator::default();
        agg.add_all(["9.9.9.0/24", "2001:db8::/32", "1.1.1.0/24", "::1"], "a");
        agg.add_all(["1.1.1.0/24", "5.5.5.0/24"], "b");

        let v4: Vec<String> = agg
            .collection()
            .entries(Family::V4)
            .iter()
            .map(|e| e.prefix.key())
            .collect();
        let v6: Vec<String> = agg
            .collection()
            .entries(Family::V6)
            .iter()
            .map(|e| e.prefix.key())
            .collect();

        assert_eq!(v4, vec!["9.9.9.0/24", "1.1.1.0/24", "5.5.5.0/24"]);
        assert_eq!(v6, vec!["2001:db8::/32", "::1/128"]);

        let all: Vec<String> = agg.collection().iter().map(|e| e.prefix.key()).collect();
        assert_eq!(all.len(), 5);
        assert_eq!(all[3], "2001:db8::/32");
    }

    #[test]
    fn test_replay_merges_source_sets() {
        let doc = BatchDocument::from_pairs(
            vec![
                ("1.2.3.0/24".to_string(), sources(&["a", "b"])),
                ("1.2.3.4/24".to_string(), sources(&["c"])),
            ],
            vec![("2001:db8::/32".to_string(), sources(&["d"]))],
        );

        let (collection, stats) = replay(&doc, FilterConfig::default());

        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.get("1.2.3.0/24").unwrap().sources,
            sources(&["a", "b", "c"])
        );
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.duplicate, 1);
    }

    #[test]
    fn test_replay_revalidates_against_current_filter() {
        let doc = BatchDocument::from_pairs(
            vec![("10.0.0.0/16".to_string(), sources(&["a"]))],
            vec![("fe80::/64".to_string(), sources(&["b"]))],
        );
        let filter = FilterConfig {
            ipv4_min_len: 24,
            exclude: vec!["fe80::/10".parse().unwrap()],
            ..Default::default()
        };

        let (collection, stats) = replay(&doc, filter);

        assert!(collection.is_empty());
        assert_eq!(stats.filtered, 2);
    }

    #[test]
    fn test_address_count() {
        let mut agg = Aggregator::default();
        agg.add_all(["192.168.0.0/24", "10.0.0.0/8", "2001:db8::/127"], "a");
        assert_eq!(
            agg.collection().address_count(Family::V4),
            256 + 16_777_216
        );
        assert_eq!(agg.collection().address_count(Family::V6), 2);
    }
}
