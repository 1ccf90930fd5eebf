//! Error types for ipmerge.
//!
//! Per-entry and per-source errors are absorbed by the aggregation loop and
//! surface only as counters and warnings. `ConfigError` and `RenderError`
//! abort the run.

use std::path::PathBuf;
use thiserror::Error;

use crate::utils::truncate;

/// A textual prefix could not be parsed as an IPv4/IPv6 network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("Invalid prefix '{text}': {reason}")]
    Invalid { text: String, reason: String },
}

/// Longest excerpt of offending input kept in a [`PrefixError`].
const MAX_ERROR_TEXT: usize = 64;

impl PrefixError {
    pub(crate) fn invalid(text: &str, reason: impl Into<String>) -> Self {
        PrefixError::Invalid {
            text: truncate(text.trim(), MAX_ERROR_TEXT),
            reason: reason.into(),
        }
    }
}

/// A live fetch of a source failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} too large: {size} bytes (max: {max} bytes)")]
    TooLarge { url: String, size: u64, max: usize },

    #[error("Fetch of '{source_id}' timed out after {seconds}s")]
    Timeout { source_id: String, seconds: u64 },

    #[error("Failed to parse feed '{source_id}': {message}")]
    Parse { source_id: String, message: String },
}

/// A snapshot could not be used to recover a failed source.
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("No snapshot for '{source_id}' at {path:?}")]
    Missing { source_id: String, path: PathBuf },

    #[error("Failed to read snapshot {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt snapshot {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A fresh snapshot could not be written.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to serialize snapshot for '{source_id}': {source}")]
    Serialize {
        source_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write snapshot {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Contradictory or unusable configuration. Fatal before any processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("--ipv4-only and --ipv6-only are mutually exclusive")]
    ConflictingFamilies,

    #[error("Snapshot recovery is enabled but no snapshot directory is configured")]
    RecoveryWithoutSnapshotDir,

    #[error("No sources selected after applying include/exclude")]
    NoSources,

    #[error("Unknown source '{0}'. Run `ipmerge sources` to list available sources")]
    UnknownSource(String),

    #[error("Unknown output format '{0}'. Run `ipmerge formats` to list available formats")]
    UnknownFormat(String),

    #[error("Minimum {family} prefix length {value} is out of range (max {max})")]
    MinLengthOutOfRange { family: String, value: u8, max: u8 },

    #[error("Invalid excluded prefix: {0}")]
    InvalidExclude(#[from] PrefixError),

    #[error("Invalid {kind} '{value}': use 1-{max} letters, digits, '_' or '-'")]
    InvalidName {
        kind: &'static str,
        value: String,
        max: usize,
    },
}

/// The output formatter failed to produce its output.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}
