//! CLI argument parsing with clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ipmerge")]
#[command(author, version, about = "Merge IP blocklists into one deduplicated set")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: /etc/ipmerge/config.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the selected sources and render the merged list
    Run(RunArgs),

    /// Re-run a previously emitted JSON document through the filters
    Replay {
        /// Batch document produced by `--format json`
        input: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List available sources
    Sources,

    /// List available output formats
    Formats,

    /// Show version
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Sources to use instead of the defaults (comma-separated ids)
    #[arg(long, value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Add a source to the selection
    #[arg(long, value_name = "SOURCE")]
    pub include: Vec<String>,

    /// Remove a source from the selection
    #[arg(long, value_name = "SOURCE")]
    pub exclude_source: Vec<String>,

    /// Directory for per-source snapshots
    #[arg(long, value_name = "DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Fall back to the last snapshot when a source cannot be fetched
    #[arg(long)]
    pub recover: bool,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep IPv4 prefixes only
    #[arg(short = '4', long, conflicts_with = "ipv6_only")]
    pub ipv4_only: bool,

    /// Keep IPv6 prefixes only
    #[arg(short = '6', long)]
    pub ipv6_only: bool,

    /// Drop IPv4 prefixes shorter than this
    #[arg(long, value_name = "LEN")]
    pub ipv4_min_length: Option<u8>,

    /// Drop IPv6 prefixes shorter than this
    #[arg(long, value_name = "LEN")]
    pub ipv6_min_length: Option<u8>,

    /// Drop prefixes inside this one (repeatable, replaces the configured list)
    #[arg(long, value_name = "PREFIX")]
    pub exclude_prefix: Vec<String>,

    /// Clear the exclusion list, including the fe80::/10 default
    #[arg(long, conflicts_with = "exclude_prefix")]
    pub no_exclude: bool,

    /// Keep globally routable unicast prefixes only
    #[arg(long)]
    pub global_unicast_only: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format (see `ipmerge formats`)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Base name of generated ipset/nftables sets
    #[arg(long)]
    pub set_name: Option<String>,

    /// nftables table name
    #[arg(long)]
    pub table_name: Option<String>,

    /// Annotate entries with their sources where the format allows it
    #[arg(long)]
    pub with_sources: bool,
}
