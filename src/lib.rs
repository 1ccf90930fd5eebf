//! # ipmerge - IP blocklist aggregator
//!
//! Fetches IP blocklists from several public feeds, normalizes every entry
//! to a canonical prefix, drops duplicates and unwanted ranges, and renders
//! one merged list that remembers which feeds reported each prefix.
//!
//! ## Features
//!
//! - **Provenance** - Every prefix carries the set of sources that listed it
//! - **Deterministic** - Output order is first-sighting order, IPv4 first
//! - **Filters** - Family restriction, minimum mask length, exclusion list, global unicast only
//! - **Snapshots** - Last good copy of each feed, used when a fetch fails
//! - **Replay** - JSON output can be fed back through different filters
//! - **Formats** - plain, json, csv, ipset and nftables scripts
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ipmerge                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: run, replay, sources, formats, version     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── File settings with command-line overrides            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Sources (reqwest + rustls)                                 │
//! │    ├── FireHOL, Spamhaus DROP, DShield, blocklist.de        │
//! │    └── RecoveryPolicy: fetch, else snapshot, else skip      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Aggregator (ipnet)                                         │
//! │    ├── Prefix normalization                                 │
//! │    ├── Deduplication with source sets                       │
//! │    └── Filters and per-outcome counters                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Output (Formatter trait)                                   │
//! │    └── plain, json, csv, ipset, nftables                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use ipmerge::aggregator::Aggregator;
//! use ipmerge::config::Config;
//! use ipmerge::fetcher::Fetcher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!
//!     let mut aggregator = Aggregator::new(config.filter_config()?);
//!     let policy = config.recovery_policy()?;
//!     let sources = config.select_sources()?;
//!     let fetcher = Fetcher::new()?;
//!
//!     policy.ingest_all(&sources, &fetcher, &mut aggregator).await;
//!
//!     let formatter = config.formatter()?;
//!     formatter.render(aggregator.collection(), &mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`aggregator`] - Deduplicating collection with provenance, replay
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Typed errors
//! - [`fetcher`] - HTTP client for downloading feeds
//! - [`filter`] - Filter rules applied on first sighting
//! - [`fs_abstraction`] - Filesystem trait for snapshot storage
//! - [`output`] - Output formatters
//! - [`prefix`] - Prefix parsing and canonical form
//! - [`recovery`] - Per-source fetch with snapshot fallback
//! - [`snapshot`] - Batch document and per-source snapshot files
//! - [`sources`] - Feed adapters and source selection
//! - [`stats`] - Outcome counters and run summary
//! - [`utils`] - Common utility functions (formatting, truncation)

pub mod aggregator;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod fs_abstraction;
pub mod output;
pub mod prefix;
pub mod recovery;
pub mod snapshot;
pub mod sources;
pub mod stats;
pub mod utils;

pub use aggregator::{add_entry, replay, Aggregator, Collection, Entry, SourceTag};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use prefix::{Family, Prefix};
pub use stats::{Outcome, Stats};
