//! `ipset restore` script.
//!
//! One `hash:net` set per family, `<set>-v4` and `<set>-v6`, flushed before
//! being refilled so the script can be re-applied.

use std::io::Write;
use tracing::warn;

use super::{join_sources, Formatter};
use crate::aggregator::{Collection, Entry};
use crate::error::RenderError;
use crate::prefix::Family;

const MIN_MAXELEM: usize = 65536;

pub struct IpsetFormatter {
    set_name: String,
    with_sources: bool,
}

impl IpsetFormatter {
    pub const ID: &'static str = "ipset";
    pub const DESCRIPTION: &'static str = "ipset restore script (hash:net per family)";

    pub fn new(set_name: &str, with_sources: bool) -> Self {
        Self {
            set_name: set_name.to_string(),
            with_sources,
        }
    }

    fn write_set(
        &self,
        out: &mut dyn Write,
        family: Family,
        entries: &[Entry],
    ) -> Result<(), RenderError> {
        let (suffix, inet) = match family {
            Family::V4 => ("v4", "inet"),
            Family::V6 => ("v6", "inet6"),
        };
        let name = format!("{}-{}", self.set_name, suffix);
        let maxelem = entries.len().max(MIN_MAXELEM);
        let comment = if self.with_sources { " comment" } else { "" };

        writeln!(
            out,
            "create {} hash:net family {} maxelem {}{} -exist",
            name, inet, maxelem, comment
        )?;
        writeln!(out, "flush {}", name)?;

        for entry in entries {
            // hash:net cannot store a zero-length prefix
            if entry.prefix.prefix_len() == 0 {
                warn!("Skipping {} in ipset output: /0 is not supported", entry.prefix);
                continue;
            }
            if self.with_sources {
                writeln!(
                    out,
                    "add {} {} comment \"{}\"",
                    name,
                    entry.prefix,
                    join_sources(&entry.sources, ",")
                )?;
            } else {
                writeln!(out, "add {} {}", name, entry.prefix)?;
            }
        }
        Ok(())
    }
}

impl Formatter for IpsetFormatter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn render(&self, collection: &Collection, out: &mut dyn Write) -> Result<(), RenderError> {
        self.write_set(out, Family::V4, collection.entries(Family::V4))?;
        self.write_set(out, Family::V6, collection.entries(Family::V6))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::output::test_support::{render_to_string, sample_collection};

    #[test]
    fn test_ipset_script() {
        let output = render_to_string(&IpsetFormatter::new("block", false), &sample_collection());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "create block-v4 hash:net family inet maxelem 65536 -exist",
                "flush block-v4",
                "add block-v4 10.0.0.0/8",
                "add block-v4 1.2.3.4/32",
                "create block-v6 hash:net family inet6 maxelem 65536 -exist",
                "flush block-v6",
                "add block-v6 2001:db8::/32",
            ]
        );
    }

    #[test]
    fn test_ipset_with_comments() {
        let output = render_to_string(&IpsetFormatter::new("block", true), &sample_collection());
        assert!(output.contains("maxelem 65536 comment -exist"));
        assert!(output.contains("add block-v4 10.0.0.0/8 comment \"alpha,beta\""));
    }

    #[test]
    fn test_ipset_skips_default_route() {
        let mut agg = Aggregator::default();
        agg.add_all(["0.0.0.0/0", "8.8.8.0/24"], "a");
        let (collection, _) = agg.into_parts();

        let output = render_to_string(&IpsetFormatter::new("block", false), &collection);
        assert!(!output.contains("0.0.0.0/0"));
        assert!(output.contains("add block-v4 8.8.8.0/24"));
    }
}
