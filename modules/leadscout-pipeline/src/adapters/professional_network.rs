use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use leadscout_common::{DiscoveryResult, Entity, SourceTag};

use super::{elapsed_ms, SourceAdapter};
use crate::confidence;
use crate::patterns::{email_patterns, is_leadership_title, normalize_role};
use crate::providers::{SearchIndex, StaffDirectory, StaffMember};
use crate::quota::SearchQuota;

fn is_company_page(url: &str) -> bool {
    url.to_lowercase().contains("linkedin.com/company")
}

/// The staff member most likely to own the company: the first with a
/// leadership title, else whoever is listed first.
pub fn pick_decision_maker(staff: &[StaffMember]) -> Option<&StaffMember> {
    staff
        .iter()
        .find(|m| is_leadership_title(&m.title))
        .or_else(|| staff.first())
}

/// Finds the company's professional-network page and reads its staff list.
pub struct ProfessionalNetworkAdapter {
    staff: Arc<dyn StaffDirectory>,
    search: Option<Arc<dyn SearchIndex>>,
    quota: Arc<SearchQuota>,
}

impl ProfessionalNetworkAdapter {
    pub fn new(
        staff: Arc<dyn StaffDirectory>,
        search: Option<Arc<dyn SearchIndex>>,
        quota: Arc<SearchQuota>,
    ) -> Self {
        Self { staff, search, quota }
    }

    async fn company_page(&self, entity: &Entity) -> Result<Option<String>> {
        if let Some(url) = entity.social_url.as_deref().filter(|u| is_company_page(u)) {
            return Ok(Some(url.to_string()));
        }
        let Some(search) = &self.search else {
            return Ok(None);
        };
        if !self.quota.try_acquire() {
            warn!(company = entity.name.as_str(), "Search quota exhausted, skipping company page lookup");
            return Ok(None);
        }
        let query = format!("site:linkedin.com/company \"{}\" {}", entity.name, entity.location)
            .trim()
            .to_string();
        let hits = search.search(&query).await?;
        Ok(hits.into_iter().map(|h| h.url).find(|u| is_company_page(u)))
    }
}

#[async_trait]
impl SourceAdapter for ProfessionalNetworkAdapter {
    fn tag(&self) -> SourceTag {
        SourceTag::ProfessionalNetwork
    }

    async fn attempt(&self, entity: &Entity, _owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        let started = Instant::now();
        let Some(domain) = entity.domain() else {
            return Ok(None);
        };
        let Some(company_url) = self.company_page(entity).await? else {
            debug!(company = entity.name.as_str(), "No company page found");
            return Ok(None);
        };

        let staff = self.staff.staff(&company_url).await?;
        let Some(member) = pick_decision_maker(&staff) else {
            debug!(company_url = company_url.as_str(), "Company page lists no staff");
            return Ok(None);
        };
        let Some(email) = email_patterns(&member.name, &domain).into_iter().next() else {
            return Ok(None);
        };

        let mut result = DiscoveryResult::new(
            SourceTag::ProfessionalNetwork,
            email.email,
            member.name.trim(),
            normalize_role(&member.title),
            confidence::base(SourceTag::ProfessionalNetwork),
        )
        .with_raw(serde_json::json!({
            "company_url": company_url,
            "staff_count": staff.len(),
        }));
        result.linkedin_url = member.profile_url.clone();
        result.metadata.elapsed_ms = elapsed_ms(started);
        Ok(Some(result))
    }
}
