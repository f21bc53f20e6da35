use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use super::types::*;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One configured connection to the messages endpoint.
pub(crate) struct ClaudeClient {
    http: reqwest::Client,
    messages_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).context("API key is not a valid header value")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .context("building Claude HTTP client")?;

        let base = base_url.unwrap_or(ANTHROPIC_API_URL).trim_end_matches('/');
        Ok(Self {
            http,
            messages_url: format!("{base}/messages"),
        })
    }

    pub async fn messages(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            url = self.messages_url.as_str(),
            "Claude messages request"
        );

        let response = self
            .http
            .post(&self.messages_url)
            .json(request)
            .send()
            .await
            .context("Claude request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Claude API error ({status}): {body}");
        }

        response.json().await.context("decoding Claude response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = ClaudeClient::new("sk-ant-test", Some("https://proxy.local/v1/")).unwrap();
        assert_eq!(client.messages_url, "https://proxy.local/v1/messages");
    }

    #[test]
    fn invalid_api_key_is_an_error_not_a_panic() {
        assert!(ClaudeClient::new("bad\nkey", None).is_err());
    }
}
