use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

use super::{elapsed_ms, SourceAdapter};
use crate::confidence;
use crate::providers::RegistrationLookup;

/// Reads the registrant contact from public WHOIS records.
pub struct DomainRegistrationAdapter {
    providers: Vec<Arc<dyn RegistrationLookup>>,
}

impl DomainRegistrationAdapter {
    /// Providers are tried in order; the first that returns a record wins.
    pub fn new(providers: Vec<Arc<dyn RegistrationLookup>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl SourceAdapter for DomainRegistrationAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::DomainRegistration
    }

    async fn attempt(&self, entity: &Entity, _owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let started = Instant::now();
        let Some(domain) = entity.domain() else {
            return Ok(None);
        };

        let mut record = None;
        for provider in &self.providers {
            match provider.lookup(&domain).await {
                Ok(Some(found)) => {
                    debug!(domain = domain.as_str(), provider = provider.name(), "Registration record found");
                    record = Some(found);
                    break;
                }
                Ok(None) => continue,
                Err(e) => warn!(domain = domain.as_str(), provider = provider.name(), error = %e, "Registration lookup failed"),
            }
        }

        let Some(record) = record else {
            return Ok(None);
        };
        let Some(email) = record.email() else {
            debug!(domain = domain.as_str(), "Registration record has no email");
            return Ok(None);
        };

        let mut result = DiscoveryResult::new(
            SourceTag::DomainRegistration,
            email,
            record.name().unwrap_or("Owner"),
            "Registrant",
            confidence::base(SourceTag::DomainRegistration),
        )
        .with_raw(serde_json::to_value(&record)?);
        result.metadata.elapsed_ms = elapsed_ms(started);
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Registration;
    use crate::testing::MockRegistry;

    fn acme() -> Entity {
        Entity::new("Acme Gym").with_website("acme.com")
    }

    #[tokio::test]
    async fn falls_through_to_second_provider() {
        let first = Arc::new(MockRegistry::new("whoisjsonapi"));
        let second = Arc::new(MockRegistry::new("domainsbot").on_domain(
            "acme.com",
            Registration {
                admin_email: Some("admin@acme.com".to_string()),
                ..Default::default()
            },
        ));
        let adapter = DomainRegistrationAdapter::new(vec![first, second]);
        let result = adapter.attempt(&acme(), None).await.unwrap().unwrap();
        assert_eq!(result.email, "admin@acme.com");
        assert_eq!(result.owner_name, "Owner");
        assert_eq!(result.owner_role, "Registrant");
        assert_eq!(result.confidence, 0.70);
    }

    #[tokio::test]
    async fn first_answer_wins_even_without_email() {
        let first = Arc::new(MockRegistry::new("whoisjsonapi").on_domain(
            "acme.com",
            Registration {
                registrant_name: Some("Redacted".to_string()),
                ..Default::default()
            },
        ));
        let second = Arc::new(MockRegistry::new("domainsbot").on_domain(
            "acme.com",
            Registration {
                owner_email: Some("owner@acme.com".to_string()),
                ..Default::default()
            },
        ));
        let adapter = DomainRegistrationAdapter::new(vec![first, second]);
        assert!(adapter.attempt(&acme(), None).await.unwrap().is_none());
    }
}
