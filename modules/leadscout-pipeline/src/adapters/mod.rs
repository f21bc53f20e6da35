// Discovery sources for the cascade.
//
// Every adapter answers one question: given a company (and maybe the name of
// its owner), what contact can this source propose? `Ok(None)` is the normal
// "nothing found" answer; `Err` is reserved for internal failures, which the
// cascade logs and treats as `None`.

pub mod domain_registration;
pub mod fallback;
pub mod pattern_guess;
pub mod professional_network;
pub mod site_scrape;
pub mod social_bio;
pub mod validator;
pub mod web_search;

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

pub use domain_registration::DomainRegistrationAdapter;
pub use fallback::FallbackAdapter;
pub use pattern_guess::PatternGuessAdapter;
pub use professional_network::ProfessionalNetworkAdapter;
pub use site_scrape::SiteScrapeAdapter;
pub use social_bio::SocialBioAdapter;
pub use validator::Validator;
pub use web_search::WebSearchAdapter;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn tag(&self) -> SourceTag;

    async fn attempt(
        &self,
        entity: &Entity,
        owner_hint: Option<&str>,
    ) -> Result<Option<DiscoveryResult>>;
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Owner hint with generic placeholders treated as absent.
pub(crate) fn usable_hint(owner_hint: Option<&str>) -> Option<&str> {
    owner_hint
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .filter(|h| !matches!(h.to_lowercase().as_str(), "unknown" | "owner" | "founder" | "fundador"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_hints_are_ignored() {
        assert_eq!(usable_hint(Some("Ana Ruiz")), Some("Ana Ruiz"));
        assert_eq!(usable_hint(Some(" Unknown ")), None);
        assert_eq!(usable_hint(Some("")), None);
        assert_eq!(usable_hint(None), None);
    }
}
