// Plain HTTP page fetching for the site-scrape adapter.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use super::PageFetcher;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; leadscout/0.1)";

/// Retries for transient failures (connect errors, 5xx).
const MAX_RETRIES: u32 = 1;
const RETRY_BASE: Duration = Duration::from_millis(500);

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            debug!(url, attempt, "Fetching page");
            let result = self.client.get(url).send().await;
            let transient = match &result {
                Ok(resp) => resp.status().is_server_error(),
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if transient && attempt < MAX_RETRIES {
                let backoff = RETRY_BASE * 3u32.pow(attempt);
                let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                warn!(url, attempt = attempt + 1, "Transient fetch failure, retrying after backoff");
                tokio::time::sleep(backoff + jitter).await;
                attempt += 1;
                continue;
            }

            let resp = result.with_context(|| format!("GET {url} failed"))?;
            if !resp.status().is_success() {
                bail!("GET {url} returned {}", resp.status());
            }
            return resp.text().await.context("Failed to read page body");
        }
    }
}
