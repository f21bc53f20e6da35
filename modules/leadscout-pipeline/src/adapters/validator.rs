use std::sync::Arc;

use tracing::{debug, warn};

use leadscout_common::{DiscoveryResult, SourceTag};

use crate::confidence::{self, Signal};
use crate::patterns::{email_domain, is_valid_email_format};
use crate::providers::DomainProbe;

/// Checks a proposed address and raises its confidence when the domain can
/// receive mail. Not a discovery source: it only ever adjusts results.
pub struct Validator {
    probe: Arc<dyn DomainProbe>,
}

impl Validator {
    pub fn new(probe: Arc<dyn DomainProbe>) -> Self {
        Self { probe }
    }

    pub fn tag(&self) -> SourceTag {
        SourceTag::Validator
    }

    /// Strongest signal available for `email`: syntax first, then the domain probe.
    pub async fn check(&self, email: &str) -> Signal {
        if !is_valid_email_format(email) {
            debug!(email, "Malformed address, skipping probe");
            return Signal::None;
        }
        let Some(domain) = email_domain(email) else {
            return Signal::None;
        };
        match self.probe.accepts_mail(domain).await {
            Ok(true) => Signal::DomainReachable,
            Ok(false) => Signal::None,
            Err(e) => {
                warn!(domain, error = %e, "Domain probe failed");
                Signal::None
            }
        }
    }

    pub async fn validate(&self, mut result: DiscoveryResult) -> DiscoveryResult {
        let signal = self.check(&result.email).await;
        result.confidence = confidence::raise(result.confidence, signal);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProbe;

    #[tokio::test]
    async fn reachable_domain_raises_low_confidence() {
        let validator = Validator::new(Arc::new(MockProbe::new().reachable("acme.com")));
        let result = DiscoveryResult::new(SourceTag::Fallback, "contact@acme.com", "Unknown", "Owner", 0.10);
        let validated = validator.validate(result).await;
        assert!((validated.confidence - 0.20).abs() < 1e-9);
    }

    #[tokio::test]
    async fn never_lowers_confidence() {
        let validator = Validator::new(Arc::new(MockProbe::new()));
        let result = DiscoveryResult::new(SourceTag::ProfessionalNetwork, "ana@acme.com", "Ana", "CEO", 0.75);
        assert_eq!(validator.validate(result).await.confidence, 0.75);

        let validator = Validator::new(Arc::new(MockProbe::new().reachable("acme.com")));
        let result = DiscoveryResult::new(SourceTag::ProfessionalNetwork, "ana@acme.com", "Ana", "CEO", 0.75);
        assert_eq!(validator.validate(result).await.confidence, 0.75);
    }

    #[tokio::test]
    async fn malformed_address_is_not_probed() {
        let probe = Arc::new(MockProbe::new().reachable("acme.com"));
        let validator = Validator::new(probe.clone());
        assert_eq!(validator.check("not-an-email").await, Signal::None);
        assert_eq!(probe.calls(), 0);
    }
}
