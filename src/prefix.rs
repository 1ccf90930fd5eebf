//! Prefix normalization.
//!
//! Turns the textual prefixes published by blocklist feeds into canonical
//! networks. The canonical string of a [`Prefix`] is the deduplication key
//! used by the aggregator, so two spellings of the same network must always
//! produce the same string.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::PrefixError;

/// Address family of a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Longest valid mask length for this family.
    pub fn max_prefix_len(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// Key used for this family in batch documents.
    pub fn section_name(self) -> &'static str {
        match self {
            Family::V4 => "ipv4",
            Family::V6 => "ipv6",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// A canonical network prefix: host bits are always cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix(IpNet);

impl Prefix {
    /// Parse a textual prefix (`addr/len` or a bare address) into its
    /// canonical form.
    ///
    /// # Examples
    /// ```
    /// use ipmerge::prefix::Prefix;
    /// let p = Prefix::parse("10.0.0.1/8").unwrap();
    /// assert_eq!(p.key(), "10.0.0.0/8");
    /// assert!(Prefix::parse("not-a-prefix").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, PrefixError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PrefixError::invalid(text, "empty input"));
        }

        let (addr_part, len_part) = match trimmed.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (trimmed, None),
        };

        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| PrefixError::invalid(text, format!("malformed address '{}'", addr_part)))?;

        let max_len = match addr {
            IpAddr::V4(_) => Family::V4.max_prefix_len(),
            IpAddr::V6(_) => Family::V6.max_prefix_len(),
        };

        let prefix_len = match len_part {
            None => max_len,
            Some(len) => parse_mask_len(text, len, max_len)?,
        };

        let net = IpNet::new(addr, prefix_len)
            .map_err(|e| PrefixError::invalid(text, e.to_string()))?;

        Ok(Self(net.trunc()))
    }

    pub fn family(&self) -> Family {
        match self.0 {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    pub fn as_ipnet(&self) -> &IpNet {
        &self.0
    }

    /// Canonical string form, the deduplication key.
    pub fn key(&self) -> String {
        self.0.to_string()
    }

    /// Check if `self` fully contains `other` (equal prefixes contain each
    /// other). Prefixes of different families never contain each other.
    pub fn contains(&self, other: &Prefix) -> bool {
        match (&self.0, &other.0) {
            (IpNet::V4(c), IpNet::V4(t)) => c.contains(t),
            (IpNet::V6(c), IpNet::V6(t)) => c.contains(t),
            _ => false,
        }
    }

    /// Number of individual addresses covered, saturating at `u128::MAX`
    /// for `::/0`.
    pub fn address_count(&self) -> u128 {
        let shift = u32::from(self.family().max_prefix_len() - self.prefix_len());
        if shift >= 128 {
            u128::MAX
        } else {
            1u128 << shift
        }
    }

    /// True when no part of the range is reserved for private, loopback,
    /// link-local, multicast, documentation or other special use.
    pub fn is_global_unicast(&self) -> bool {
        match self.0 {
            IpNet::V4(net) => is_global_v4(&net),
            IpNet::V6(net) => is_global_v6(&net),
        }
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prefix::parse(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<IpNet> for Prefix {
    fn from(net: IpNet) -> Self {
        Self(net.trunc())
    }
}

fn parse_mask_len(text: &str, len: &str, max_len: u8) -> Result<u8, PrefixError> {
    if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PrefixError::invalid(
            text,
            format!("non-numeric mask length '{}'", len),
        ));
    }
    let value: u32 = len
        .parse()
        .map_err(|_| PrefixError::invalid(text, format!("mask length '{}' out of range", len)))?;
    if value > u32::from(max_len) {
        return Err(PrefixError::invalid(
            text,
            format!("mask length {} exceeds {}", value, max_len),
        ));
    }
    Ok(value as u8)
}

/// IANA special-purpose IPv4 blocks as (network, prefix length).
const SPECIAL_V4: &[(u32, u8)] = &[
    (0x0000_0000, 8),  // 0.0.0.0/8 "this network"
    (0x0A00_0000, 8),  // 10.0.0.0/8
    (0x6440_0000, 10), // 100.64.0.0/10 shared address space
    (0x7F00_0000, 8),  // 127.0.0.0/8
    (0xA9FE_0000, 16), // 169.254.0.0/16
    (0xAC10_0000, 12), // 172.16.0.0/12
    (0xC000_0000, 24), // 192.0.0.0/24
    (0xC000_0200, 24), // 192.0.2.0/24 TEST-NET-1
    (0xC058_6300, 24), // 192.88.99.0/24 6to4 relay
    (0xC0A8_0000, 16), // 192.168.0.0/16
    (0xC612_0000, 15), // 198.18.0.0/15 benchmarking
    (0xC633_6400, 24), // 198.51.100.0/24 TEST-NET-2
    (0xCB00_7100, 24), // 203.0.113.0/24 TEST-NET-3
    (0xE000_0000, 4),  // 224.0.0.0/4 multicast
    (0xF000_0000, 4),  // 240.0.0.0/4 reserved + broadcast
];

/// 2000::/3, the only IPv6 range allocated for global unicast.
const GLOBAL_UNICAST_V6: (u128, u8) = (0x2000 << 112, 3);

/// Special-purpose blocks carved out of 2000::/3.
const SPECIAL_V6: &[(u128, u8)] = &[
    (0x2001_0000 << 96, 23), // 2001::/23 IETF protocol assignments
    (0x2001_0db8 << 96, 32), // 2001:db8::/32 documentation
    (0x2002 << 112, 16),     // 2002::/16 6to4
    (0x3fff << 112, 20),     // 3fff::/20 documentation
];

fn mask_v4(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(len))
    }
}

fn mask_v6(len: u8) -> u128 {
    if len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(len))
    }
}

fn is_global_v4(net: &Ipv4Net) -> bool {
    let addr = u32::from(net.network());
    let len = net.prefix_len();
    !SPECIAL_V4.iter().any(|&(special, special_len)| {
        let mask = mask_v4(len.min(special_len));
        addr & mask == special & mask
    })
}

fn is_global_v6(net: &Ipv6Net) -> bool {
    let addr = u128::from(net.network());
    let len = net.prefix_len();

    let (global, global_len) = GLOBAL_UNICAST_V6;
    if len < global_len || addr & mask_v6(global_len) != global {
        return false;
    }

    !SPECIAL_V6.iter().any(|&(special, special_len)| {
        let mask = mask_v6(len.min(special_len));
        addr & mask == special & mask
    })
}
