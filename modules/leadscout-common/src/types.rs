use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::extract_domain;

// --- Entities and contacts ---

/// A company under resolution. Read-only for the duration of a cascade run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub social_url: Option<String>,
    #[serde(default)]
    pub location: String,
    pub description: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            website: None,
            social_url: None,
            location: String::new(),
            description: None,
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_social_url(mut self, url: impl Into<String>) -> Self {
        self.social_url = Some(url.into());
        self
    }

    /// Mail domain derived from the website, if any.
    pub fn domain(&self) -> Option<String> {
        self.website.as_deref().and_then(extract_domain)
    }
}

/// Decision-maker details, filled in progressively as sources report them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    if slot.as_deref().map_or(true, |s| s.trim().is_empty()) {
        *slot = Some(value.to_string());
    }
}

impl CandidateContact {
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    pub fn fill_name(&mut self, name: &str) {
        if self.name.trim().is_empty() && !name.trim().is_empty() {
            self.name = name.trim().to_string();
        }
    }

    pub fn fill_role(&mut self, role: &str) {
        if self.role.trim().is_empty() && !role.trim().is_empty() {
            self.role = role.trim().to_string();
        }
    }

    pub fn fill_email(&mut self, email: Option<&str>) {
        fill(&mut self.email, email);
    }

    pub fn fill_phone(&mut self, phone: Option<&str>) {
        fill(&mut self.phone, phone);
    }

    pub fn fill_linkedin(&mut self, url: Option<&str>) {
        fill(&mut self.linkedin, url);
    }

    pub fn fill_facebook(&mut self, url: Option<&str>) {
        fill(&mut self.facebook, url);
    }

    pub fn fill_instagram(&mut self, url: Option<&str>) {
        fill(&mut self.instagram, url);
    }

    pub fn fill_twitter(&mut self, url: Option<&str>) {
        fill(&mut self.twitter, url);
    }

    /// Merge a cascade result without overwriting anything already known.
    pub fn absorb(&mut self, result: &DiscoveryResult) {
        self.fill_email(Some(&result.email));
        self.fill_name(&result.owner_name);
        self.fill_role(&result.owner_role);
        self.fill_linkedin(result.linkedin_url.as_deref());
        self.fill_twitter(result.twitter_url.as_deref());
    }
}

// --- Discovery ---

/// Where a discovery result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    ProfessionalNetwork,
    WebSearch,
    SiteScrape,
    PatternGuess,
    DomainRegistration,
    SocialBio,
    Validator,
    Fallback,
}

impl SourceTag {
    pub const ALL: [SourceTag; 8] = [
        SourceTag::ProfessionalNetwork,
        SourceTag::WebSearch,
        SourceTag::SiteScrape,
        SourceTag::PatternGuess,
        SourceTag::DomainRegistration,
        SourceTag::SocialBio,
        SourceTag::Validator,
        SourceTag::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::ProfessionalNetwork => "professional_network",
            SourceTag::WebSearch => "web_search",
            SourceTag::SiteScrape => "site_scrape",
            SourceTag::PatternGuess => "pattern_guess",
            SourceTag::DomainRegistration => "domain_registration",
            SourceTag::SocialBio => "social_bio",
            SourceTag::Validator => "validator",
            SourceTag::Fallback => "fallback",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMetadata {
    pub attempt: u32,
    pub elapsed_ms: u64,
    pub raw: Option<serde_json::Value>,
}

/// A contact proposed by one source, with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub email: String,
    pub owner_name: String,
    pub owner_role: String,
    pub source: SourceTag,
    pub confidence: f64,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub metadata: DiscoveryMetadata,
}

impl DiscoveryResult {
    pub fn new(
        source: SourceTag,
        email: impl Into<String>,
        owner_name: impl Into<String>,
        owner_role: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            email: email.into(),
            owner_name: owner_name.into(),
            owner_role: owner_role.into(),
            source,
            confidence: confidence.clamp(0.0, 1.0),
            linkedin_url: None,
            twitter_url: None,
            metadata: DiscoveryMetadata::default(),
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.metadata.raw = Some(raw);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Searching,
    Found,
    Failed,
    Validating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryLogEntry {
    pub timestamp: DateTime<Utc>,
    pub attempt: u32,
    pub source: SourceTag,
    pub status: DiscoveryStatus,
    pub message: String,
}

impl DiscoveryLogEntry {
    pub fn new(
        attempt: u32,
        source: SourceTag,
        status: DiscoveryStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            attempt,
            source,
            status,
            message: message.into(),
        }
    }
}

// --- Leads ---

/// Bulk-listing platform a lead was found on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Maps,
    LinkedIn,
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "maps" | "gmail" | "google_maps" => Ok(Platform::Maps),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Fast,
    Deep,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(SearchMode::Fast),
            "deep" => Ok(SearchMode::Deep),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadAnalysis {
    pub summary: String,
    #[serde(default)]
    pub opportunity: String,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub bottleneck: String,
    #[serde(default)]
    pub entry_angle: String,
}

/// A company plus its decision-maker. Raw listings become leads, and leads with
/// an email are accepted into a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub entity: Entity,
    pub platform: Platform,
    pub contact: CandidateContact,
    #[serde(default)]
    pub summary: String,
    pub discovery: Option<DiscoveryResult>,
    pub analysis: Option<LeadAnalysis>,
}

impl Lead {
    pub fn new(entity: Entity, platform: Platform) -> Self {
        Self {
            entity,
            platform,
            contact: CandidateContact::default(),
            summary: String::new(),
            discovery: None,
            analysis: None,
        }
    }

    pub fn company_name(&self) -> &str {
        &self.entity.name
    }

    pub fn website(&self) -> Option<&str> {
        self.entity.website.as_deref().filter(|w| !w.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_never_overwrites() {
        let mut contact = CandidateContact::default();
        contact.fill_email(Some("ana@acme.com"));
        contact.fill_email(Some("other@acme.com"));
        contact.fill_email(None);
        assert_eq!(contact.email.as_deref(), Some("ana@acme.com"));

        contact.fill_name("Ana Ruiz");
        contact.fill_name("");
        contact.fill_name("Someone Else");
        assert_eq!(contact.name, "Ana Ruiz");
    }

    #[test]
    fn fill_replaces_blank_values() {
        let mut contact = CandidateContact {
            phone: Some("  ".to_string()),
            ..Default::default()
        };
        contact.fill_phone(Some("+34 600 000 000"));
        assert_eq!(contact.phone.as_deref(), Some("+34 600 000 000"));
    }

    #[test]
    fn absorb_fills_gaps_only() {
        let mut contact = CandidateContact {
            name: "Ana Ruiz".to_string(),
            ..Default::default()
        };
        let mut result =
            DiscoveryResult::new(SourceTag::WebSearch, "ana@acme.com", "A. Ruiz", "CEO", 0.65);
        result.linkedin_url = Some("https://linkedin.com/in/ana".to_string());
        contact.absorb(&result);
        assert_eq!(contact.name, "Ana Ruiz");
        assert_eq!(contact.role, "CEO");
        assert!(contact.has_email());
        assert_eq!(contact.linkedin.as_deref(), Some("https://linkedin.com/in/ana"));
    }

    #[test]
    fn source_tag_round_trips_through_str() {
        for tag in SourceTag::ALL {
            assert_eq!(SourceTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(SourceTag::parse("carrier_pigeon"), None);
    }

    #[test]
    fn entity_domain_from_website() {
        let entity = Entity::new("Acme Gym").with_website("https://www.acme.com/");
        assert_eq!(entity.domain().as_deref(), Some("acme.com"));
        assert_eq!(Entity::new("No Site").domain(), None);
    }

    #[test]
    fn platform_parsing() {
        assert_eq!("LinkedIn".parse::<Platform>(), Ok(Platform::LinkedIn));
        assert_eq!("gmail".parse::<Platform>(), Ok(Platform::Maps));
        assert!("fax".parse::<Platform>().is_err());
    }
}
