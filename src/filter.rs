//! Filter rules applied to a prefix on its first sighting.

use std::fmt;

use crate::prefix::{Family, Prefix};

/// Restrict output to a single address family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FamilyRestriction {
    #[default]
    Any,
    Ipv4Only,
    Ipv6Only,
}

impl FamilyRestriction {
    pub fn allows(self, family: Family) -> bool {
        match self {
            FamilyRestriction::Any => true,
            FamilyRestriction::Ipv4Only => family == Family::V4,
            FamilyRestriction::Ipv6Only => family == Family::V6,
        }
    }
}

/// Immutable filter configuration, fixed for the whole run.
///
/// The default accepts everything; the CLI layers its own defaults (such as
/// excluding `fe80::/10`) on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub family: FamilyRestriction,
    /// Prefixes shorter than this are rejected as too broad.
    pub ipv4_min_len: u8,
    pub ipv6_min_len: u8,
    /// Super-prefixes whose sub-prefixes are never emitted.
    pub exclude: Vec<Prefix>,
    pub global_unicast_only: bool,
}

/// Why a prefix was filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    WrongFamily(Family),
    NotGlobalUnicast,
    TooBroad { prefix_len: u8, min_len: u8 },
    Excluded(Prefix),
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::WrongFamily(family) => write!(f, "{} excluded by family restriction", family),
            FilterReason::NotGlobalUnicast => f.write_str("not global unicast"),
            FilterReason::TooBroad { prefix_len, min_len } => {
                write!(f, "mask /{} shorter than minimum /{}", prefix_len, min_len)
            }
            FilterReason::Excluded(by) => write!(f, "inside excluded prefix {}", by),
        }
    }
}

impl FilterConfig {
    pub fn min_len(&self, family: Family) -> u8 {
        match family {
            Family::V4 => self.ipv4_min_len,
            Family::V6 => self.ipv6_min_len,
        }
    }

    /// Run the rules in order: family, global unicast, minimum length,
    /// exclusion list. The first failing rule wins.
    pub fn check(&self, prefix: &Prefix) -> Result<(), FilterReason> {
        let family = prefix.family();

        if !self.family.allows(family) {
            return Err(FilterReason::WrongFamily(family));
        }

        if self.global_unicast_only && !prefix.is_global_unicast() {
            return Err(FilterReason::NotGlobalUnicast);
        }

        let min_len = self.min_len(family);
        if prefix.prefix_len() < min_len {
            return Err(FilterReason::TooBroad {
                prefix_len: prefix.prefix_len(),
                min_len,
            });
        }

        if let Some(by) = self.exclude.iter().find(|ex| ex.contains(prefix)) {
            return Err(FilterReason::Excluded(*by));
        }

        Ok(())
    }
}
