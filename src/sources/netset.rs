//! FireHOL `.netset` and plain one-entry-per-line lists.

use async_trait::async_trait;
use tracing::info;

use super::Source;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::utils::format_count;

pub struct NetsetSource {
    id: &'static str,
    name: &'static str,
    url: &'static str,
    default: bool,
}

impl NetsetSource {
    pub fn new(id: &'static str, name: &'static str, url: &'static str, default: bool) -> Self {
        Self {
            id,
            name,
            url,
            default,
        }
    }
}

#[async_trait]
impl Source for NetsetSource {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn used_by_default(&self) -> bool {
        self.default
    }

    async fn load(&self, fetcher: &Fetcher) -> Result<Vec<String>, FetchError> {
        info!("Fetching {}...", self.name);
        let content = fetcher.fetch_text(self.url).await?;
        let entries = parse_netset(&content);
        info!("Fetched {} - {} entries", self.name, format_count(entries.len() as u64));
        Ok(entries)
    }
}

/// Extract entries from a netset/plain list: one IP or CIDR per line, `#`
/// comments and blank lines ignored, trailing comments stripped.
pub fn parse_netset(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_netset_mixed() {
        let content =
            "# FireHOL blocklist\n\n192.168.1.1\n10.0.0.0/8\n# another comment\n172.16.0.0/12";
        assert_eq!(
            parse_netset(content),
            vec!["192.168.1.1", "10.0.0.0/8", "172.16.0.0/12"]
        );
    }

    #[test]
    fn test_parse_netset_keeps_invalid_lines() {
        // Validation belongs to the aggregator so bad lines get counted
        let content = "192.168.1.1\nnot-an-ip\ninvalid-cidr/99\n";
        assert_eq!(parse_netset(content).len(), 3);
    }

    #[test]
    fn test_parse_netset_whitespace_and_trailing_comments() {
        let content = "  192.168.1.1  \n\t10.0.0.0/8\t# bogon\n2001:db8::/32 extra";
        assert_eq!(
            parse_netset(content),
            vec!["192.168.1.1", "10.0.0.0/8", "2001:db8::/32"]
        );
    }

    #[test]
    fn test_parse_netset_empty_and_comments_only() {
        assert!(parse_netset("").is_empty());
        assert!(parse_netset("# a\n# b\n\n").is_empty());
    }

    #[test]
    fn test_netset_source_metadata() {
        let source = NetsetSource::new("x", "X list", "https://example.com/x", true);
        assert_eq!(source.id(), "x");
        assert_eq!(source.name(), "X list");
        assert!(source.used_by_default());
    }
}
