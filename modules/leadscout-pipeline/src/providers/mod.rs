// Trait boundaries for every external collaborator the pipeline talks to.
//
// Adapters and the acquisition loop only see these traits, so tests swap in
// the mocks from `testing.rs`: no network, no Apify account, no database.

pub mod apify;
pub mod claude;
pub mod dns;
pub mod http;
pub mod serper;
pub mod whois;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use leadscout_common::Lead;

use crate::interpret::InterpretedQuery;

// ---------------------------------------------------------------------------
// Web search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Plain HTTP
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait DomainProbe: Send + Sync {
    /// Whether `domain` looks able to receive mail.
    async fn accepts_mail(&self, domain: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Company staff, registration records and social profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub name: String,
    pub title: String,
    pub profile_url: Option<String>,
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Staff listed on a company's professional-network page.
    async fn staff(&self, company_url: &str) -> Result<Vec<StaffMember>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub registrant_name: Option<String>,
    pub registrant_email: Option<String>,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
}

fn first_present<'a>(values: [&'a Option<String>; 3]) -> Option<&'a str> {
    values
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
}

impl Registration {
    pub fn email(&self) -> Option<&str> {
        first_present([&self.registrant_email, &self.admin_email, &self.owner_email])
    }

    pub fn name(&self) -> Option<&str> {
        first_present([&self.registrant_name, &self.admin_name, &self.owner_name])
    }
}

#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the provider has no record for the domain.
    async fn lookup(&self, domain: &str) -> Result<Option<Registration>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub handle: String,
    pub name: Option<String>,
    pub bio: String,
    pub verified: bool,
}

#[async_trait]
pub trait SocialProfiles: Send + Sync {
    async fn profile(&self, handle: &str) -> Result<Option<SocialProfile>>;
}

// ---------------------------------------------------------------------------
// Bulk listing and contact scraping (asynchronous provider jobs)
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ListingProvider: Send + Sync {
    fn platform(&self) -> leadscout_common::Platform;

    /// Run one listing job at the given crawl depth and map its items to leads.
    async fn fetch(
        &self,
        query: &InterpretedQuery,
        depth: u32,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<Lead>>;
}

/// Contacts found on one website.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedContacts {
    pub domain: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub linkedin: Option<String>,
}

#[async_trait]
pub trait ContactScraper: Send + Sync {
    async fn scrape(
        &self,
        websites: &[String],
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<ScrapedContacts>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_prefers_registrant_then_admin() {
        let reg = Registration {
            registrant_email: Some(" ".to_string()),
            admin_email: Some("admin@acme.com".to_string()),
            owner_email: Some("owner@acme.com".to_string()),
            owner_name: Some("Ana Ruiz".to_string()),
            ..Default::default()
        };
        assert_eq!(reg.email(), Some("admin@acme.com"));
        assert_eq!(reg.name(), Some("Ana Ruiz"));
        assert_eq!(Registration::default().email(), None);
    }
}
