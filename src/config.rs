//! Configuration management for ipmerge.
//!
//! A YAML file provides the base settings; command-line flags are layered on
//! top. Everything is validated before the first source is fetched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::{FilterArgs, OutputArgs, RunArgs};
use crate::error::ConfigError;
use crate::filter::{FamilyRestriction, FilterConfig};
use crate::output::{formatter_for, Formatter, FormatterOptions};
use crate::prefix::{Family, Prefix};
use crate::recovery::RecoveryPolicy;
use crate::sources::{select_sources, Source};

/// Read when `--config` is not given; a missing file means defaults.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ipmerge/config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sources to use instead of the defaults
    pub sources: Option<Vec<String>>,

    /// Sources added to the selection
    pub include: Vec<String>,

    /// Sources removed from the selection
    pub exclude_sources: Vec<String>,

    pub filter: FilterSettings,

    pub snapshot: SnapshotSettings,

    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub ipv4_only: bool,
    pub ipv6_only: bool,
    pub ipv4_min_length: u8,
    pub ipv6_min_length: u8,
    /// Prefixes whose sub-prefixes are dropped
    pub exclude_prefixes: Vec<String>,
    pub global_unicast_only: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            ipv4_only: false,
            ipv6_only: false,
            ipv4_min_length: 0,
            ipv6_min_length: 0,
            exclude_prefixes: vec!["fe80::/10".to_string()],
            global_unicast_only: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    /// Where per-source snapshots are written; none disables them
    pub dir: Option<PathBuf>,
    /// Use the last snapshot when a source cannot be fetched
    pub recover: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: String,
    /// Output file; stdout when unset
    pub path: Option<PathBuf>,
    pub set_name: String,
    pub table_name: String,
    pub with_sources: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        let options = FormatterOptions::default();
        Self {
            format: "plain".to_string(),
            path: None,
            set_name: options.set_name,
            table_name: options.table_name,
            with_sources: options.with_sources,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the explicit file, else the default one when it exists, else
    /// built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve_with_default(explicit, Path::new(DEFAULT_CONFIG_PATH))
    }

    fn resolve_with_default(explicit: Option<&Path>, default: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if default.exists() => Self::load(default),
            None => {
                debug!("No config file at {:?}, using defaults", default);
                Ok(Self::default())
            }
        }
    }

    /// Layer `run` flags over the file settings.
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        if let Some(sources) = &args.sources {
            self.sources = Some(sources.clone());
        }
        self.include.extend(args.include.iter().cloned());
        self.exclude_sources
            .extend(args.exclude_source.iter().cloned());
        if let Some(dir) = &args.snapshot_dir {
            self.snapshot.dir = Some(dir.clone());
        }
        if args.recover {
            self.snapshot.recover = true;
        }
        self.apply_filter_args(&args.filters);
        self.apply_output_args(&args.output);
    }

    /// Command-line family flags override the file, so `-6` wins over a
    /// configured `ipv4_only`.
    pub fn apply_filter_args(&mut self, args: &FilterArgs) {
        let filter = &mut self.filter;
        if args.ipv4_only {
            filter.ipv4_only = true;
            filter.ipv6_only = false;
        }
        if args.ipv6_only {
            filter.ipv6_only = true;
            filter.ipv4_only = false;
        }
        if let Some(len) = args.ipv4_min_length {
            filter.ipv4_min_length = len;
        }
        if let Some(len) = args.ipv6_min_length {
            filter.ipv6_min_length = len;
        }
        if args.no_exclude {
            filter.exclude_prefixes.clear();
        } else if !args.exclude_prefix.is_empty() {
            filter.exclude_prefixes = args.exclude_prefix.clone();
        }
        if args.global_unicast_only {
            filter.global_unicast_only = true;
        }
    }

    pub fn apply_output_args(&mut self, args: &OutputArgs) {
        let output = &mut self.output;
        if let Some(format) = &args.format {
            output.format = format.clone();
        }
        if let Some(path) = &args.output {
            output.path = Some(path.clone());
        }
        if let Some(name) = &args.set_name {
            output.set_name = name.clone();
        }
        if let Some(name) = &args.table_name {
            output.table_name = name.clone();
        }
        if args.with_sources {
            output.with_sources = true;
        }
    }

    /// Validate everything a replay needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter_config()?;
        self.formatter()?;
        Ok(())
    }

    /// Validate everything a live run needs.
    pub fn validate_run(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.recovery_policy()?;
        self.select_sources()?;
        Ok(())
    }

    /// Build the engine's filter configuration.
    pub fn filter_config(&self) -> Result<FilterConfig, ConfigError> {
        let settings = &self.filter;

        let family = match (settings.ipv4_only, settings.ipv6_only) {
            (true, true) => return Err(ConfigError::ConflictingFamilies),
            (true, false) => FamilyRestriction::Ipv4Only,
            (false, true) => FamilyRestriction::Ipv6Only,
            (false, false) => FamilyRestriction::Any,
        };

        for (family, value) in [
            (Family::V4, settings.ipv4_min_length),
            (Family::V6, settings.ipv6_min_length),
        ] {
            if value > family.max_prefix_len() {
                return Err(ConfigError::MinLengthOutOfRange {
                    family: family.to_string(),
                    value,
                    max: family.max_prefix_len(),
                });
            }
        }

        let exclude = settings
            .exclude_prefixes
            .iter()
            .map(|s| Prefix::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FilterConfig {
            family,
            ipv4_min_len: settings.ipv4_min_length,
            ipv6_min_len: settings.ipv6_min_length,
            exclude,
            global_unicast_only: settings.global_unicast_only,
        })
    }

    pub fn formatter_options(&self) -> FormatterOptions {
        FormatterOptions {
            set_name: self.output.set_name.clone(),
            table_name: self.output.table_name.clone(),
            with_sources: self.output.with_sources,
        }
    }

    pub fn formatter(&self) -> Result<Box<dyn Formatter>, ConfigError> {
        formatter_for(&self.output.format, &self.formatter_options())
    }

    pub fn recovery_policy(&self) -> Result<RecoveryPolicy, ConfigError> {
        RecoveryPolicy::new(self.snapshot.dir.clone(), self.snapshot.recover)
    }

    pub fn select_sources(&self) -> Result<Vec<Box<dyn Source>>, ConfigError> {
        select_sources(
            self.sources.as_deref(),
            &self.include,
            &self.exclude_sources,
        )
    }
}
