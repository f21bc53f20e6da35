// Web search backed by Serper (Google results).

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::{SearchHit, SearchIndex};

const SERPER_URL: &str = "https://google.serper.dev/search";

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

pub struct SerperSearch {
    api_key: String,
    client: reqwest::Client,
    max_results: usize,
}

impl SerperSearch {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            max_results: 10,
        }
    }
}

#[async_trait]
impl SearchIndex for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        info!(query, max_results = self.max_results, "search: querying serper");

        let body = serde_json::json!({
            "q": query,
            "num": self.max_results,
        });

        let resp = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?;

        if !resp.status().is_success() {
            bail!("Serper API error ({})", resp.status());
        }

        let data: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let hits: Vec<SearchHit> = data
            .organic
            .into_iter()
            .map(|r| SearchHit {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect();

        info!(query, count = hits.len(), "search: complete");
        Ok(hits)
    }
}
