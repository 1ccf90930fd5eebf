//! DShield "top 20 attacking subnets" (`block.txt`).
//!
//! Tab-separated rows `start end netblock attacks name country email`,
//! preceded by `#` comments and a `Start` header row.

use async_trait::async_trait;
use tracing::info;

use super::Source;
use crate::error::FetchError;
use crate::fetcher::Fetcher;

const DSHIELD_URL: &str = "https://feeds.dshield.org/block.txt";

pub struct DshieldSource;

impl DshieldSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DshieldSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for DshieldSource {
    fn id(&self) -> &str {
        "dshield"
    }

    fn name(&self) -> &str {
        "DShield top attacking subnets"
    }

    fn used_by_default(&self) -> bool {
        true
    }

    async fn load(&self, fetcher: &Fetcher) -> Result<Vec<String>, FetchError> {
        info!("Fetching {}...", self.name());
        let content = fetcher.fetch_text(DSHIELD_URL).await?;
        let entries = parse_dshield(&content);
        info!("Fetched {} - {} entries", self.name(), entries.len());
        Ok(entries)
    }
}

/// Turn each data row into `start/netblock`. Rows missing the netblock column
/// are passed through as-is for the aggregator to judge.
pub fn parse_dshield(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| !line.starts_with("Start"))
        .map(|line| {
            let mut columns = line.split_whitespace();
            match (columns.next(), columns.next(), columns.next()) {
                (Some(start), Some(_end), Some(netblock)) => format!("{}/{}", start, netblock),
                _ => line.to_string(),
            }
        })
        .collect()
}
