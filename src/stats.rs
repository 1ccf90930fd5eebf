//! Run statistics and the end-of-run summary.

use std::fmt;
use std::ops::AddAssign;
use tracing::{info, warn};

use crate::aggregator::Collection;
use crate::prefix::Family;
use crate::utils::{format_address_count, format_count};

/// Result of feeding one raw entry through the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    Duplicate,
    Filtered,
    Error,
}

/// Counters incremented exactly once per processed raw entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub accepted: u64,
    pub duplicate: u64,
    pub filtered: u64,
    pub error: u64,
}

impl Stats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Accepted => self.accepted += 1,
            Outcome::Duplicate => self.duplicate += 1,
            Outcome::Filtered => self.filtered += 1,
            Outcome::Error => self.error += 1,
        }
    }

    /// Number of raw entries processed.
    pub fn total(&self) -> u64 {
        self.accepted + self.duplicate + self.filtered + self.error
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.accepted += rhs.accepted;
        self.duplicate += rhs.duplicate;
        self.filtered += rhs.filtered;
        self.error += rhs.error;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted={} duplicate={} filtered={} error={}",
            self.accepted, self.duplicate, self.filtered, self.error
        )
    }
}

/// Log the end-of-run summary. Always emitted after a successful run.
pub fn log_summary(stats: &Stats, collection: &Collection) {
    info!(
        "Processed {} entries: {} accepted, {} duplicate, {} filtered, {} error",
        format_count(stats.total()),
        format_count(stats.accepted),
        format_count(stats.duplicate),
        format_count(stats.filtered),
        format_count(stats.error),
    );
    info!(
        "Result: {} IPv4 prefixes ({} addresses), {} IPv6 prefixes",
        format_count(collection.entries(Family::V4).len() as u64),
        format_address_count(collection.address_count(Family::V4)),
        format_count(collection.entries(Family::V6).len() as u64),
    );

    if let Some(message) = error_warning(stats) {
        warn!("{}", message);
    }
}

/// Each malformed entry was already logged when it was skipped.
fn error_warning(stats: &Stats) -> Option<String> {
    (stats.error > 0).then(|| {
        format!(
            "{} malformed entries were skipped (see the warnings above)",
            format_count(stats.error)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_increments_exactly_one_counter() {
        let mut stats = Stats::default();
        stats.record(Outcome::Accepted);
        assert_eq!(
            stats,
            Stats {
                accepted: 1,
                ..Default::default()
            }
        );

        stats.record(Outcome::Duplicate);
        stats.record(Outcome::Filtered);
        stats.record(Outcome::Error);
        stats.record(Outcome::Error);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.duplicate, 1);
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.error, 2);
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_add_assign() {
        let mut a = Stats {
            accepted: 1,
            duplicate: 2,
            filtered: 3,
            error: 4,
        };
        a += Stats {
            accepted: 10,
            duplicate: 0,
            filtered: 1,
            error: 0,
        };
        assert_eq!(a.accepted, 11);
        assert_eq!(a.duplicate, 2);
        assert_eq!(a.filtered, 4);
        assert_eq!(a.error, 4);
    }

    #[test]
    fn test_display() {
        let stats = Stats {
            accepted: 3,
            duplicate: 1,
            filtered: 0,
            error: 2,
        };
        assert_eq!(
            stats.to_string(),
            "accepted=3 duplicate=1 filtered=0 error=2"
        );
    }

    #[test]
    fn test_error_warning_points_at_logged_entries() {
        assert_eq!(error_warning(&Stats::default()), None);

        let stats = Stats {
            accepted: 10,
            error: 3,
            ..Default::default()
        };
        let message = error_warning(&stats).unwrap();
        assert!(message.starts_with("3 malformed entries"));
        assert!(!message.contains("--verbose"));
    }
}
