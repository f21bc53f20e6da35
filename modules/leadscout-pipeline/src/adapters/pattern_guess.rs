use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

use super::{elapsed_ms, usable_hint, SourceAdapter};
use crate::confidence::{self, Signal, UNVALIDATED_PATTERN};
use crate::patterns::email_patterns;
use crate::providers::DomainProbe;

/// Guesses the owner's address from common naming conventions.
pub struct PatternGuessAdapter {
    probe: Option<Arc<dyn DomainProbe>>,
}

impl PatternGuessAdapter {
    pub fn new(probe: Option<Arc<dyn DomainProbe>>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl SourceAdapter for PatternGuessAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::PatternGuess
    }

    async fn attempt(&self, entity: &Entity, owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let started = Instant::now();
        let Some(domain) = entity.domain() else {
            return Ok(None);
        };
        let hint = usable_hint(owner_hint);
        let name = hint.unwrap_or("founder");
        let patterns = email_patterns(name, &domain);
        let Some(top) = patterns.first() else {
            return Ok(None);
        };
        debug!(company = entity.name.as_str(), count = patterns.len(), "Generated email patterns");

        let owner_name = hint.unwrap_or("Unknown");

        // Every pattern shares the domain, so one lookup settles all of them.
        let reachable = match &self.probe {
            Some(probe) => match probe.accepts_mail(&domain).await {
                Ok(reachable) => reachable,
                Err(e) => {
                    warn!(error = %e, "Domain probe unavailable, using top pattern");
                    false
                }
            },
            None => false,
        };
        if !reachable {
            debug!(domain = domain.as_str(), "Domain not confirmed to accept mail");
        }

        let mut result = DiscoveryResult::new(
            SourceTag::PatternGuess,
            &top.email,
            owner_name,
            "Owner",
            if reachable {
                confidence::score(SourceTag::PatternGuess, Signal::DomainReachable)
            } else {
                UNVALIDATED_PATTERN
            },
        )
        .with_raw(serde_json::json!({
            "patterns_generated": patterns.len(),
            "validated": reachable,
        }));
        result.metadata.elapsed_ms = elapsed_ms(started);
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProbe;

    fn acme() -> Entity {
        Entity::new("Acme Gym").with_website("acme.com")
    }

    #[tokio::test]
    async fn validated_pattern_gets_reachable_score() {
        let adapter = PatternGuessAdapter::new(Some(Arc::new(MockProbe::new().reachable("acme.com"))));
        let result = adapter.attempt(&acme(), Some("Ana Ruiz")).await.unwrap().unwrap();
        assert_eq!(result.email, "ana.ruiz@acme.com");
        assert_eq!(result.owner_name, "Ana Ruiz");
        assert!((result.confidence - 0.50).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unvalidated_top_pattern_without_probe() {
        let adapter = PatternGuessAdapter::new(None);
        let result = adapter.attempt(&acme(), None).await.unwrap().unwrap();
        assert_eq!(result.email, "founder@acme.com");
        assert_eq!(result.confidence, 0.40);
        assert_eq!(result.owner_name, "Unknown");
    }

    #[tokio::test]
    async fn domain_is_probed_once() {
        let probe = Arc::new(MockProbe::new());
        let adapter = PatternGuessAdapter::new(Some(probe.clone()));
        let result = adapter.attempt(&acme(), Some("Ana Ruiz")).await.unwrap().unwrap();
        assert_eq!(result.email, "ana.ruiz@acme.com");
        assert_eq!(result.confidence, 0.40);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn failing_probe_keeps_unvalidated_top_pattern() {
        let probe = Arc::new(MockProbe::new().failing());
        let adapter = PatternGuessAdapter::new(Some(probe.clone()));
        let result = adapter.attempt(&acme(), Some("Ana Ruiz")).await.unwrap().unwrap();
        assert_eq!(result.email, "ana.ruiz@acme.com");
        assert_eq!(result.confidence, 0.40);
        assert_eq!(probe.calls(), 1);
    }
}
