use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

use super::{elapsed_ms, usable_hint, SourceAdapter};
use crate::confidence;
use crate::patterns::{email_domain, extract_emails, filter_spam};
use crate::providers::{SearchHit, SearchIndex};
use crate::quota::SearchQuota;

/// Queries tried in order, most specific first.
pub fn search_queries(company: &str, name: &str, domain: Option<&str>) -> Vec<String> {
    let mut queries = vec![format!("\"{name}\" \"{company}\" email")];
    let words: Vec<&str> = name.split_whitespace().collect();
    if let ([first, .., last], Some(domain)) = (words.as_slice(), domain) {
        queries.push(format!("\"{first}\" \"{last}\" \"{company}\" @{domain}"));
    }
    queries.extend([
        format!("\"{company}\" founder \"{name}\""),
        format!("site:linkedin.com/in \"{name}\" \"{company}\""),
        format!("founder \"{company}\" email"),
        format!("CEO \"{company}\" linkedin"),
        format!("\"{company}\" owner contact"),
        format!("site:crunchbase.com \"{name}\" \"{company}\""),
        format!("\"{company}\" founder"),
        format!("\"{company}\" CEO"),
    ]);
    queries.dedup();
    queries
}

/// Emails in a page of hits, with role/no-reply addresses removed. Addresses
/// on the company's own domain come first.
pub fn emails_in_hits(hits: &[SearchHit], domain: Option<&str>) -> Vec<String> {
    let mut emails = Vec::new();
    for hit in hits {
        for email in extract_emails(&format!("{} {}", hit.title, hit.snippet)) {
            if !emails.contains(&email) {
                emails.push(email);
            }
        }
    }
    let mut emails = filter_spam(emails);
    if let Some(domain) = domain {
        emails.sort_by_key(|e| email_domain(e) != Some(domain));
    }
    emails
}

/// Searches the web index for published addresses. Every query spends one
/// unit of the shared daily quota.
pub struct WebSearchAdapter {
    search: Arc<dyn SearchIndex>,
    quota: Arc<SearchQuota>,
}

impl WebSearchAdapter {
    pub fn new(search: Arc<dyn SearchIndex>, quota: Arc<SearchQuota>) -> Self {
        Self { search, quota }
    }

    pub fn quota(&self) -> &Arc<SearchQuota> {
        &self.quota
    }

    pub fn reset_daily_counter(&self) {
        self.quota.reset_daily_counter();
    }
}

#[async_trait]
impl SourceAdapter for WebSearchAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::WebSearch
    }

    async fn attempt(&self, entity: &Entity, owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let started = Instant::now();
        let hint = usable_hint(owner_hint);
        let domain = entity.domain();
        let queries = search_queries(&entity.name, hint.unwrap_or("founder"), domain.as_deref());

        let mut linkedin_url = None;
        for (issued, query) in queries.iter().enumerate() {
            if !self.quota.try_acquire() {
                warn!(
                    company = entity.name.as_str(),
                    issued,
                    "Search quota exhausted, stopping web search"
                );
                break;
            }

            let hits = match self.search.search(query).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(query = query.as_str(), error = %e, "Web search failed");
                    continue;
                }
            };
            debug!(query = query.as_str(), results = hits.len(), "Web search results");

            if linkedin_url.is_none() {
                linkedin_url = hits
                    .iter()
                    .find(|h| h.url.contains("linkedin.com/in/"))
                    .map(|h| h.url.clone());
            }

            if let Some(email) = emails_in_hits(&hits, domain.as_deref()).into_iter().next() {
                let mut result = DiscoveryResult::new(
                    SourceTag::WebSearch,
                    email,
                    hint.unwrap_or("Fundador"),
                    "Owner",
                    confidence::base(SourceTag::WebSearch),
                )
                .with_raw(serde_json::json!({
                    "query": query,
                    "results_count": hits.len(),
                }));
                result.linkedin_url = linkedin_url;
                result.metadata.elapsed_ms = elapsed_ms(started);
                return Ok(Some(result));
            }
        }

        Ok(None)
    }
}
