//! Batch document format and on-disk snapshots.
//!
//! The batch document is a JSON object with one section per address family,
//! each mapping a canonical prefix to the identifiers of the sources that
//! reported it:
//!
//! ```json
//! {
//!   "ipv4": { "1.2.3.0/24": ["dshield", "firehol_level1"] },
//!   "ipv6": { "2001:db8::/32": ["spamhaus_dropv6"] }
//! }
//! ```
//!
//! The same document is used for the `json` output format, for replay input
//! and for per-source snapshots. Section key order follows collection order.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::aggregator::Collection;
use crate::error::{PersistError, RecoveryError};
use crate::fs_abstraction::{FileSystem, RealFileSystem};
use crate::prefix::{Family, Prefix};

/// One family section: prefix -> source identifiers, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section(Vec<(String, BTreeSet<String>)>);

impl Section {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter().map(|(prefix, sources)| (prefix, sources))
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (prefix, sources) in &self.0 {
            map.serialize_entry(prefix, sources)?;
        }
        map.end()
    }
}

/// Source identifiers may be written as a single string or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(BTreeSet<String>),
}

impl From<OneOrMany> for BTreeSet<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(id) => BTreeSet::from([id]),
            OneOrMany::Many(ids) => ids,
        }
    }
}

struct SectionVisitor;

impl<'de> Visitor<'de> for SectionVisitor {
    type Value = Section;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of prefix to source identifiers")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Section, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((prefix, sources)) = access.next_entry::<String, OneOrMany>()? {
            entries.push((prefix, sources.into()));
        }
        Ok(Section(entries))
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SectionVisitor)
    }
}

/// Structured batch document. Missing sections are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDocument {
    #[serde(default)]
    pub ipv4: Section,
    #[serde(default)]
    pub ipv6: Section,
}

impl BatchDocument {
    pub fn from_pairs(
        ipv4: Vec<(String, BTreeSet<String>)>,
        ipv6: Vec<(String, BTreeSet<String>)>,
    ) -> Self {
        Self {
            ipv4: Section(ipv4),
            ipv6: Section(ipv6),
        }
    }

    /// Snapshot of a full aggregated collection.
    pub fn from_collection(collection: &Collection) -> Self {
        let section = |family| {
            Section(
                collection
                    .entries(family)
                    .iter()
                    .map(|e| (e.prefix.key(), e.sources.clone()))
                    .collect(),
            )
        };
        Self {
            ipv4: section(Family::V4),
            ipv6: section(Family::V6),
        }
    }

    /// Document for one source: every prefix tagged with `source_id`.
    /// Duplicates collapse onto their first occurrence.
    pub fn for_source<'a, I>(source_id: &str, prefixes: I) -> Self
    where
        I: IntoIterator<Item = &'a Prefix>,
    {
        let mut seen = HashSet::new();
        let mut doc = Self::default();
        for prefix in prefixes {
            let key = prefix.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            let section = match prefix.family() {
                Family::V4 => &mut doc.ipv4,
                Family::V6 => &mut doc.ipv6,
            };
            section
                .0
                .push((key, BTreeSet::from([source_id.to_string()])));
        }
        doc
    }

    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, IPv4 section first.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.ipv4.iter().chain(self.ipv6.iter())
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Per-source snapshot files under one directory, named `<source_id>.json`.
pub struct SnapshotStore {
    dir: PathBuf,
    fs: Box<dyn FileSystem>,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self::with_fs(dir, Box::new(RealFileSystem))
    }

    pub fn with_fs<P: Into<PathBuf>>(dir: P, fs: Box<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", source_id))
    }

    pub fn exists(&self, source_id: &str) -> bool {
        self.fs.exists(&self.path_for(source_id))
    }

    /// Read back the prefixes saved for `source_id`.
    pub fn load(&self, source_id: &str) -> Result<Vec<String>, RecoveryError> {
        let path = self.path_for(source_id);
        if !self.fs.exists(&path) {
            return Err(RecoveryError::Missing {
                source_id: source_id.to_string(),
                path,
            });
        }

        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|source| RecoveryError::Read {
                path: path.clone(),
                source,
            })?;
        let doc = BatchDocument::from_json(&content)
            .map_err(|source| RecoveryError::Corrupt { path, source })?;

        Ok(doc.entries().map(|(prefix, _)| prefix.clone()).collect())
    }

    /// Persist the parsed entries of a successful fetch. Entries that do not
    /// parse are left out. Returns the number of prefixes written.
    pub fn save<S: AsRef<str>>(&self, source_id: &str, entries: &[S]) -> Result<usize, PersistError> {
        let prefixes: Vec<Prefix> = entries
            .iter()
            .filter_map(|e| Prefix::parse(e.as_ref()).ok())
            .collect();
        let doc = BatchDocument::for_source(source_id, &prefixes);

        let json = doc.to_json().map_err(|source| PersistError::Serialize {
            source_id: source_id.to_string(),
            source,
        })?;

        let path = self.path_for(source_id);
        self.fs
            .create_dir_all(&self.dir)
            .and_then(|_| self.fs.write_atomic(&path, json.as_bytes()))
            .map_err(|source| PersistError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Saved {} prefixes for {} to {:?}", doc.len(), source_id, path);
        Ok(doc.len())
    }
}
