use std::sync::{Arc, LazyLock};
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use url::Url;

use ai_client::{extract_json, truncate_to_char_boundary};
use leadscout_common::{website_url, DiscoveryResult, Entity, SourceTag};

use super::{elapsed_ms, SourceAdapter};
use crate::confidence;
use crate::patterns::primary_email;
use crate::providers::{PageFetcher, Summarizer};

/// Link fragments that usually point at an about or team page, in priority order.
pub const ABOUT_SLUGS: &[&str] = &[
    "about",
    "nosotros",
    "about-us",
    "quienes-somos",
    "team",
    "equipo",
    "founders",
];

/// Page content sent to the summarizer is cut to this many bytes.
const MAX_CONTENT_BYTES: usize = 4000;

static RE_ABOUT_LINKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ABOUT_SLUGS
        .iter()
        .map(|slug| {
            Regex::new(&format!(r#"(?i)href=["']([^"']*{}[^"']*)["']"#, regex::escape(slug))).unwrap()
        })
        .collect()
});

const EXTRACT_OWNER_SYSTEM: &str = r#"You extract data from company web pages. From this HTML, extract the name and title of the founder, owner or CEO.

Respond ONLY with valid JSON, no markdown:
{"name": "Juan García", "role": "Founder"}

If not found, respond:
{"name": null, "role": null}"#;

/// First about-style link on the page, resolved against `base`.
pub fn find_about_link(html: &str, base: &str) -> Option<String> {
    RE_ABOUT_LINKS.iter().find_map(|re| {
        let href = re.captures(html)?.get(1)?.as_str();
        match Url::parse(base).and_then(|b| b.join(href)) {
            Ok(url) => Some(url.to_string()),
            Err(_) => Some(format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/'))),
        }
    })
}

/// Reads the company's about page and asks the summarizer who runs it.
pub struct SiteScrapeAdapter {
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl SiteScrapeAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        Self { fetcher, summarizer }
    }

    async fn about_page(&self, website: &str) -> Option<String> {
        let base = website_url(website);
        let html = match self.fetcher.fetch(&base).await {
            Ok(html) => html,
            Err(e) => {
                debug!(url = base.as_str(), error = %e, "Homepage unreachable");
                return None;
            }
        };

        let lower = html.to_lowercase();
        if lower.contains("about") || lower.contains("nosotros") {
            return Some(html);
        }
        let Some(about_url) = find_about_link(&html, &base) else {
            return Some(html);
        };
        match self.fetcher.fetch(&about_url).await {
            Ok(about) => Some(about),
            Err(e) => {
                debug!(url = about_url.as_str(), error = %e, "About page unreachable, using homepage");
                Some(html)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for SiteScrapeAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::SiteScrape
    }

    async fn attempt(&self, entity: &Entity, _owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let started = Instant::now();
        let Some(summarizer) = &self.summarizer else {
            return Ok(None);
        };
        let (Some(website), Some(domain)) = (entity.website.as_deref(), entity.domain()) else {
            return Ok(None);
        };
        let Some(html) = self.about_page(website).await else {
            return Ok(None);
        };

        let snippet = truncate_to_char_boundary(&html, MAX_CONTENT_BYTES);
        let user = format!("Company: {}\n\nHTML:\n{}", entity.name, snippet);
        let answer = summarizer.complete(EXTRACT_OWNER_SYSTEM, &user).await?;

        let parsed = extract_json(&answer);
        let Some(name) = parsed
            .as_ref()
            .and_then(|v| v.get("name"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            debug!(company = entity.name.as_str(), "No owner named on site");
            return Ok(None);
        };
        let role = parsed
            .as_ref()
            .and_then(|v| v.get("role"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Owner");

        let mut result = DiscoveryResult::new(
            SourceTag::SiteScrape,
            primary_email(name, &domain),
            name,
            role,
            confidence::base(SourceTag::SiteScrape),
        )
        .with_raw(serde_json::json!({
            "extracted_from": "about_page",
            "content_bytes": html.len(),
        }));
        result.metadata.elapsed_ms = elapsed_ms(started);
        Ok(Some(result))
    }
}
