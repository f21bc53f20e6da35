use anyhow::Result;
use async_trait::async_trait;

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

use super::SourceAdapter;
use crate::confidence;

/// Last resort: the generic `contact@` mailbox of the company's domain.
pub struct FallbackAdapter;

#[async_trait]
impl SourceAdapter for FallbackAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::Fallback
    }

    async fn attempt(&self, entity: &Entity, _owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let Some(domain) = entity.domain() else {
            return Ok(None);
        };
        Ok(Some(
            DiscoveryResult::new(
                SourceTag::Fallback,
                format!("contact@{domain}"),
                "Unknown",
                "Owner",
                confidence::base(SourceTag::Fallback),
            )
            .with_raw(serde_json::json!({ "fallback": true })),
        ))
    }
}
