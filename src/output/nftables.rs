//! `nft -f` script: an `inet` table holding one interval set per family.
//!
//! The table is added then flushed before being redefined, so applying the
//! script twice replaces the sets instead of failing.

use std::io::Write;
use tracing::warn;

use super::Formatter;
use crate::aggregator::{Collection, Entry};
use crate::error::RenderError;
use crate::prefix::Family;

/// Elements are written verbatim into the script.
fn is_safe_nft_element(s: &str) -> bool {
    // Only allow: digits, dots (IPv4), colons (IPv6), slashes (CIDR), a-f (IPv6 hex)
    s.chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ':' || c == '/' || ('a'..='f').contains(&c))
}

pub struct NftablesFormatter {
    table_name: String,
    set_name: String,
}

impl NftablesFormatter {
    pub const ID: &'static str = "nftables";
    pub const DESCRIPTION: &'static str = "nft -f script with an inet table and interval sets";

    pub fn new(table_name: &str, set_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            set_name: set_name.to_string(),
        }
    }

    fn write_set(
        &self,
        out: &mut dyn Write,
        family: Family,
        entries: &[Entry],
    ) -> Result<(), RenderError> {
        let (suffix, addr_type) = match family {
            Family::V4 => ("v4", "ipv4_addr"),
            Family::V6 => ("v6", "ipv6_addr"),
        };

        writeln!(out, "    set {}_{} {{", self.set_name, suffix)?;
        writeln!(out, "        type {}", addr_type)?;
        writeln!(out, "        flags interval")?;
        writeln!(out, "        auto-merge")?;

        let elements: Vec<String> = entries
            .iter()
            .map(|e| e.prefix.key())
            .filter(|s| {
                let safe = is_safe_nft_element(s);
                if !safe {
                    warn!("Filtered unsafe nftables element: {}", s);
                }
                safe
            })
            .collect();

        if !elements.is_empty() {
            writeln!(out, "        elements = {{ {} }}", elements.join(", "))?;
        }
        writeln!(out, "    }}")?;
        Ok(())
    }
}

impl Formatter for NftablesFormatter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn render(&self, collection: &Collection, out: &mut dyn Write) -> Result<(), RenderError> {
        writeln!(out, "add table inet {}", self.table_name)?;
        writeln!(out, "flush table inet {}", self.table_name)?;
        writeln!(out)?;
        writeln!(out, "table inet {} {{", self.table_name)?;
        self.write_set(out, Family::V4, collection.entries(Family::V4))?;
        writeln!(out)?;
        self.write_set(out, Family::V6, collection.entries(Family::V6))?;
        writeln!(out, "}}")?;
        Ok(())
    }
}
