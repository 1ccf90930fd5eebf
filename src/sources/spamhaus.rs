//! Spamhaus DROP lists, published as JSON lines.
//!
//! Each record line looks like
//! `{"cidr":"1.10.16.0/20","sblid":"SBL256894","rir":"apnic"}`; the last
//! line is a metadata record without a `cidr` field.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::Source;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::utils::format_count;

#[derive(Deserialize)]
struct DropRecord {
    cidr: Option<String>,
}

pub struct SpamhausDropSource {
    id: &'static str,
    name: &'static str,
    url: &'static str,
}

impl SpamhausDropSource {
    pub fn new(id: &'static str, name: &'static str, url: &'static str) -> Self {
        Self { id, name, url }
    }
}

#[async_trait]
impl Source for SpamhausDropSource {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn used_by_default(&self) -> bool {
        true
    }

    async fn load(&self, fetcher: &Fetcher) -> Result<Vec<String>, FetchError> {
        info!("Fetching {}...", self.name);
        let content = fetcher.fetch_text(self.url).await?;
        let entries = parse_drop_json(self.id, &content)?;
        info!("Fetched {} - {} entries", self.name, format_count(entries.len() as u64));
        Ok(entries)
    }
}

/// Extract the `cidr` of every record. A body with lines but no parseable
/// record (an HTML error page, say) is a parse failure.
pub fn parse_drop_json(source_id: &str, content: &str) -> Result<Vec<String>, FetchError> {
    let mut entries = Vec::new();
    let mut records = 0usize;
    let mut lines = 0usize;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        lines += 1;
        match serde_json::from_str::<DropRecord>(line) {
            Ok(record) => {
                records += 1;
                if let Some(cidr) = record.cidr {
                    entries.push(cidr);
                }
            }
            Err(e) => debug!("{}: skipping unparseable line: {}", source_id, e),
        }
    }

    if lines > 0 && records == 0 {
        return Err(FetchError::Parse {
            source_id: source_id.to_string(),
            message: "no JSON records found".to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drop_json() {
        let content = r#"{"cidr":"1.10.16.0/20","sblid":"SBL256894","rir":"apnic"}
{"cidr":"1.19.0.0/16","sblid":"SBL434604","rir":"apnic"}
{"type":"metadata","timestamp":1700000000,"size":2,"records":2,"copyright":"(c) Spamhaus"}
"#;
        let entries = parse_drop_json("spamhaus_drop", content).unwrap();
        assert_eq!(entries, vec!["1.10.16.0/20", "1.19.0.0/16"]);
    }

    #[test]
    fn test_parse_drop_json_ipv6() {
        let content = "{\"cidr\":\"2001:678:738::/48\",\"sblid\":\"SBL1\",\"rir\":\"ripencc\"}\n";
        let entries = parse_drop_json("spamhaus_dropv6", content).unwrap();
        assert_eq!(entries, vec!["2001:678:738::/48"]);
    }

    #[test]
    fn test_parse_drop_json_skips_bad_lines() {
        let content = "{\"cidr\":\"1.10.16.0/20\"}\ngarbage\n";
        let entries = parse_drop_json("spamhaus_drop", content).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_parse_drop_json_html_is_error() {
        let content = "<html>\n<body>Service unavailable</body>\n</html>\n";
        let err = parse_drop_json("spamhaus_drop", content).unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[test]
    fn test_parse_drop_json_empty() {
        assert!(parse_drop_json("spamhaus_drop", "").unwrap().is_empty());
    }
}
