use std::sync::{Arc, LazyLock};
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

use super::{elapsed_ms, SourceAdapter};
use crate::confidence;
use crate::patterns::primary_email;
use crate::providers::SocialProfiles;

static RE_FOUNDER_BIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)founder|creator|created|ceo|chief|owner").unwrap());
static RE_HANDLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?\b(?:twitter|x)\.com/@?([A-Za-z0-9_]{1,15})").unwrap()
});

/// Handles to try for a company, most specific first.
pub fn handle_variants(entity: &Entity) -> Vec<String> {
    let mut handles: Vec<String> = Vec::new();
    let mut push = |h: String| {
        let h: String = h
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if !h.is_empty() && !handles.contains(&h) {
            handles.push(h);
        }
    };

    if let Some(caps) = entity
        .social_url
        .as_deref()
        .and_then(|url| RE_HANDLE_URL.captures(url))
    {
        push(caps[1].to_string());
    }
    let name = entity.name.trim().to_lowercase();
    let words: Vec<&str> = name.split_whitespace().collect();
    push(words.concat());
    push(words.join("_"));
    if let Some(first) = words.first() {
        push(first.to_string());
    }
    handles
}

fn role_from_bio(bio: &str) -> &'static str {
    let lower = bio.to_lowercase();
    if lower.contains("ceo") || lower.contains("chief") {
        "CEO"
    } else if lower.contains("owner") {
        "Owner"
    } else {
        "Founder"
    }
}

/// Looks for a founder behind the company's X/Twitter account.
pub struct SocialBioAdapter {
    profiles: Arc<dyn SocialProfiles>,
}

impl SocialBioAdapter {
    pub fn new(profiles: Arc<dyn SocialProfiles>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl SourceAdapter for SocialBioAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::SocialBio
    }

    async fn attempt(&self, entity: &Entity, _owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let started = Instant::now();
        let Some(domain) = entity.domain() else {
            return Ok(None);
        };

        for handle in handle_variants(entity) {
            let Some(profile) = self.profiles.profile(&handle).await? else {
                continue;
            };

            // The first account that exists decides.
            if !(profile.verified || RE_FOUNDER_BIO.is_match(&profile.bio)) {
                debug!(handle = handle.as_str(), "Account bio names no founder");
                return Ok(None);
            }

            let name = profile
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| handle.clone());
            let mut result = DiscoveryResult::new(
                SourceTag::SocialBio,
                primary_email(&name, &domain),
                name,
                role_from_bio(&profile.bio),
                confidence::base(SourceTag::SocialBio),
            )
            .with_raw(serde_json::to_value(&profile)?);
            result.twitter_url = Some(format!("https://x.com/{handle}"));
            result.metadata.elapsed_ms = elapsed_ms(started);
            return Ok(Some(result));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SocialProfile;
    use crate::testing::MockSocialProfiles;

    #[test]
    fn variants_from_url_and_name() {
        let entity = Entity::new("Acme Gym Madrid")
            .with_website("acme.com")
            .with_social_url("https://x.com/AcmeGymHQ");
        assert_eq!(
            handle_variants(&entity),
            vec!["acmegymhq", "acmegymmadrid", "acme_gym_madrid", "acme"]
        );
    }

    #[tokio::test]
    async fn founder_bio_yields_result() {
        let profiles = MockSocialProfiles::new().on_handle(
            "acmegym",
            SocialProfile {
                handle: "acmegym".to_string(),
                name: Some("Ana Ruiz".to_string()),
                bio: "Founder & CEO of Acme Gym".to_string(),
                verified: false,
            },
        );
        let adapter = SocialBioAdapter::new(Arc::new(profiles));
        let entity = Entity::new("Acme Gym").with_website("acme.com");
        let result = adapter.attempt(&entity, None).await.unwrap().unwrap();
        assert_eq!(result.email, "ana.ruiz@acme.com");
        assert_eq!(result.owner_role, "CEO");
        assert_eq!(result.twitter_url.as_deref(), Some("https://x.com/acmegym"));
        assert_eq!(result.confidence, 0.60);
    }

    #[tokio::test]
    async fn plain_account_yields_nothing() {
        let profiles = MockSocialProfiles::new().on_handle(
            "acmegym",
            SocialProfile {
                handle: "acmegym".to_string(),
                name: Some("Acme Gym".to_string()),
                bio: "Best gym in town".to_string(),
                verified: false,
            },
        );
        let adapter = SocialBioAdapter::new(Arc::new(profiles));
        let entity = Entity::new("Acme Gym").with_website("acme.com");
        assert!(adapter.attempt(&entity, None).await.unwrap().is_none());
    }
}
