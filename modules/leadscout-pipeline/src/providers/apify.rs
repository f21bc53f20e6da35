// Apify-backed providers: Google Maps and LinkedIn listings, the contact
// details scraper, LinkedIn company staff and X/Twitter profiles.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use apify_client::{
    ApifyClient, ContactDetails, LinkedInProfile, LinkedInSearchInput, Place, PlacesSearchInput,
    PollPolicy,
};
use leadscout_common::{clean_website, Entity, Lead, Platform};

use super::{
    ContactScraper, ListingProvider, ScrapedContacts, SocialProfile, SocialProfiles, StaffDirectory,
    StaffMember,
};
use crate::interpret::InterpretedQuery;
use crate::patterns::normalize_role;

const UNKNOWN_COMPANY: &str = "Empresa no identificada";

/// Staff and profile lookups run inside the cascade, which already bounds
/// them with a timeout; polling faster lets short jobs finish in time.
fn cascade_policy() -> PollPolicy {
    PollPolicy {
        max_polls: 10,
        interval: Duration::from_secs(2),
        cancelled: None,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Raw item mapping
// ---------------------------------------------------------------------------

/// Convert a Google Maps place into a lead.
pub fn lead_from_place(place: &Place, industry: &str) -> Lead {
    let name = non_empty(place.display_name()).unwrap_or("Sin Nombre");
    let mut entity = Entity::new(name);
    if let Some(id) = non_empty(place.place_id.as_deref()) {
        entity.id = id.to_string();
    }
    entity.website = non_empty(place.website.as_deref()).map(clean_website);
    entity.location = non_empty(place.address.as_deref())
        .or(non_empty(place.full_address.as_deref()))
        .unwrap_or_default()
        .to_string();
    entity.description = place.category_name.clone();

    let mut lead = Lead::new(entity, Platform::Maps);
    lead.contact.fill_role("Propietario");
    lead.contact.fill_email(place.first_email());
    lead.contact.fill_phone(place.first_phone());
    lead.contact.fill_facebook(place.facebook.as_deref());
    lead.contact.fill_instagram(place.instagram.as_deref());
    lead.summary = format!(
        "{} con {} reseñas ({})",
        non_empty(place.category_name.as_deref()).unwrap_or(industry),
        place.reviews_count.unwrap_or(0),
        place
            .total_score
            .map(|s| format!("{s:.1}⭐"))
            .unwrap_or_else(|| "N/A".to_string()),
    );
    lead
}

/// Convert a LinkedIn people-search profile into a lead.
pub fn lead_from_profile(profile: &LinkedInProfile, default_location: &str) -> Lead {
    let person = profile.display_name();
    let company = non_empty(profile.company.as_deref())
        .map(str::to_string)
        .or_else(|| person.clone())
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    let headline = profile.headline.clone().unwrap_or_default();
    let role = normalize_role(&headline);

    let mut entity = Entity::new(company.clone());
    entity.id = format!("linkedin-{}", Uuid::new_v4());
    entity.social_url = non_empty(profile.profile_url.as_deref()).map(str::to_string);
    entity.location = non_empty(profile.location.as_deref())
        .unwrap_or(default_location)
        .to_string();

    let mut lead = Lead::new(entity, Platform::LinkedIn);
    lead.contact.fill_name(person.as_deref().unwrap_or_default());
    lead.contact.fill_role(&role);
    lead.contact.fill_email(profile.email.as_deref());
    lead.contact.fill_phone(profile.phone.as_deref());
    lead.contact.fill_linkedin(profile.profile_url.as_deref());
    let headline_head: String = headline.chars().take(80).collect();
    lead.summary = format!("{role} en {company}. {headline_head}").trim().to_string();
    lead
}

/// LinkedIn people-search term: `(role OR role OR role) industry location`.
pub fn linkedin_search_term(query: &InterpretedQuery) -> String {
    let roles = query
        .target_roles
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({roles}) {} {}", query.industry, query.location)
}

fn scraped_from_details(details: ContactDetails) -> ScrapedContacts {
    ScrapedContacts {
        domain: details
            .domain
            .or(details.url)
            .map(|d| clean_website(&d))
            .unwrap_or_default(),
        emails: details.emails,
        phones: details.phones,
        linkedin: details.linkedins.into_iter().next(),
    }
}

// ---------------------------------------------------------------------------
// Listing providers
// ---------------------------------------------------------------------------

pub struct MapsListing {
    client: Arc<ApifyClient>,
}

impl MapsListing {
    pub fn new(client: Arc<ApifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ListingProvider for MapsListing {
    fn platform(&self) -> Platform {
        Platform::Maps
    }

    async fn fetch(
        &self,
        query: &InterpretedQuery,
        depth: u32,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<Lead>> {
        let search = format!("{} {}", query.search_query, query.location)
            .trim()
            .to_string();
        let input = PlacesSearchInput::new(search, depth);
        let policy = PollPolicy::default().with_cancel(cancel.clone());
        let places = self.client.search_places(&input, &policy).await?;
        info!(places = places.len(), depth, "Maps listing complete");
        Ok(places
            .iter()
            .map(|p| lead_from_place(p, &query.industry))
            .collect())
    }
}

pub struct LinkedInListing {
    client: Arc<ApifyClient>,
}

impl LinkedInListing {
    pub fn new(client: Arc<ApifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ListingProvider for LinkedInListing {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn fetch(
        &self,
        query: &InterpretedQuery,
        depth: u32,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<Lead>> {
        let input = LinkedInSearchInput::people(linkedin_search_term(query), depth);
        let policy = PollPolicy::default().with_cancel(cancel.clone());
        let profiles = self.client.search_linkedin_people(&input, &policy).await?;
        info!(profiles = profiles.len(), depth, "LinkedIn listing complete");
        Ok(profiles
            .iter()
            .map(|p| lead_from_profile(p, &query.location))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Contact scraper
// ---------------------------------------------------------------------------

pub struct ApifyContactScraper {
    client: Arc<ApifyClient>,
}

impl ApifyContactScraper {
    pub fn new(client: Arc<ApifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContactScraper for ApifyContactScraper {
    async fn scrape(
        &self,
        websites: &[String],
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<ScrapedContacts>> {
        let urls: Vec<String> = websites
            .iter()
            .map(|w| leadscout_common::website_url(w))
            .collect();
        let policy = PollPolicy::default().with_cancel(cancel.clone());
        let details = self.client.scrape_contacts(&urls, &policy).await?;
        Ok(details.into_iter().map(scraped_from_details).collect())
    }
}

// ---------------------------------------------------------------------------
// Cascade-side lookups
// ---------------------------------------------------------------------------

pub struct ApifyStaffDirectory {
    client: Arc<ApifyClient>,
    max_employees: u32,
}

impl ApifyStaffDirectory {
    pub fn new(client: Arc<ApifyClient>) -> Self {
        Self {
            client,
            max_employees: 10,
        }
    }
}

#[async_trait]
impl StaffDirectory for ApifyStaffDirectory {
    async fn staff(&self, company_url: &str) -> Result<Vec<StaffMember>> {
        let employees = self
            .client
            .linkedin_company_employees(company_url, self.max_employees, &cascade_policy())
            .await?;
        Ok(employees
            .into_iter()
            .map(|e| StaffMember {
                name: e.name,
                title: e.title,
                profile_url: Some(e.url).filter(|u| !u.is_empty()),
            })
            .collect())
    }
}

pub struct ApifyTwitterProfiles {
    client: Arc<ApifyClient>,
}

impl ApifyTwitterProfiles {
    pub fn new(client: Arc<ApifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SocialProfiles for ApifyTwitterProfiles {
    async fn profile(&self, handle: &str) -> Result<Option<SocialProfile>> {
        let profile = self.client.twitter_profile(handle, &cascade_policy()).await?;
        Ok(profile.map(|p| SocialProfile {
            handle: handle.to_string(),
            name: p.name,
            bio: p.bio,
            verified: p.verified,
        }))
    }
}
