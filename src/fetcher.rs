//! HTTP client shared by all source adapters.

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::utils::format_bytes;

const TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 2000;

/// Maximum size per feed (32 MB). The largest FireHOL sets are a few MB.
const MAX_FEED_SIZE: usize = 32 * 1024 * 1024;

/// HTTP client with request timeout, retry and a body size limit.
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    max_size: usize,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(format!("ipmerge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            max_size: MAX_FEED_SIZE,
        })
    }

    /// Override retry count and base delay.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch a URL as text, retrying with exponential backoff.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay * (1 << (attempt - 1));
                debug!("Retry {} after {:?} for {}", attempt, delay, url);
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                // Oversized responses will not shrink on retry
                Err(e @ FetchError::TooLarge { .. }) => return Err(e),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Http {
            url: url.to_string(),
            message: "no attempt made".to_string(),
        }))
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let http_err = |e: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size as u64 {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    size: content_length,
                    max: self.max_size,
                });
            }
        }

        let body = response.text().await.map_err(http_err)?;

        // Content-Length may be absent or wrong
        if body.len() > self.max_size {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size: body.len() as u64,
                max: self.max_size,
            });
        }

        debug!("Downloaded {} from {}", format_bytes(body.len() as u64), url);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_new() {
        let fetcher = Fetcher::new().unwrap();
        assert_eq!(fetcher.max_retries, MAX_RETRIES);
        assert_eq!(fetcher.max_size, MAX_FEED_SIZE);
    }

    #[test]
    fn test_with_retries_at_least_one_attempt() {
        let fetcher = Fetcher::new()
            .unwrap()
            .with_retries(0, Duration::from_millis(1));
        assert_eq!(fetcher.max_retries, 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_fetch_error() {
        let fetcher = Fetcher::new()
            .unwrap()
            .with_retries(1, Duration::from_millis(1));
        let result = fetcher.fetch_text("not-a-url").await;
        assert!(matches!(result, Err(FetchError::Http { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_fetch_error() {
        let fetcher = Fetcher::new()
            .unwrap()
            .with_retries(2, Duration::from_millis(1));
        let result = fetcher.fetch_text("ftp://invalid-scheme.example").await;
        assert!(result.is_err());
    }
}
