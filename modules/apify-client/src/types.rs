use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// A start URL entry shared by most actor inputs.
#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ready,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl RunStatus {
    /// Unknown transitional states (ABORTING, TIMING-OUT) count as still running.
    pub fn parse(status: &str) -> Self {
        match status {
            "READY" => RunStatus::Ready,
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "ABORTED" => RunStatus::Aborted,
            "TIMED-OUT" => RunStatus::TimedOut,
            _ => RunStatus::Running,
        }
    }
}

// --- Google Maps places ---

/// Input for the Google Maps places crawler.
#[derive(Debug, Clone, Serialize)]
pub struct PlacesSearchInput {
    #[serde(rename = "searchStringsArray")]
    pub search_strings_array: Vec<String>,
    /// Crawl depth. Raising it across calls surfaces places past the first page.
    #[serde(rename = "maxCrawledPlacesPerSearch")]
    pub max_crawled_places_per_search: u32,
    pub language: String,
    #[serde(rename = "includeWebsiteEmail")]
    pub include_website_email: bool,
    #[serde(rename = "scrapeContacts")]
    pub scrape_contacts: bool,
    #[serde(rename = "maxImages")]
    pub max_images: u32,
    #[serde(rename = "maxReviews")]
    pub max_reviews: u32,
}

impl PlacesSearchInput {
    pub fn new(search: impl Into<String>, depth: u32) -> Self {
        Self {
            search_strings_array: vec![search.into()],
            max_crawled_places_per_search: depth,
            language: "es".to_string(),
            include_website_email: true,
            scrape_contacts: true,
            max_images: 0,
            max_reviews: 0,
        }
    }
}

/// A single place from the Google Maps dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    #[serde(rename = "placeId")]
    pub place_id: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "fullAddress")]
    pub full_address: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    #[serde(rename = "categoryName")]
    pub category_name: Option<String>,
    #[serde(rename = "reviewsCount")]
    pub reviews_count: Option<i64>,
    #[serde(rename = "totalScore")]
    pub total_score: Option<f64>,
}

impl Place {
    pub fn display_name(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    pub fn first_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or_else(|| self.emails.first().map(String::as_str))
    }

    pub fn first_phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| self.phones.first().map(String::as_str))
    }
}

// --- Contact details scraper ---

#[derive(Debug, Clone, Serialize)]
pub struct ContactScraperInput {
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "maxRequestsPerWebsite")]
    pub max_requests_per_website: u32,
    #[serde(rename = "sameDomainOnly")]
    pub same_domain_only: bool,
}

impl ContactScraperInput {
    pub fn for_urls(urls: &[String]) -> Self {
        Self {
            start_urls: urls
                .iter()
                .map(|url| StartUrl { url: url.clone() })
                .collect(),
            max_requests_per_website: 3,
            same_domain_only: true,
        }
    }
}

/// Contacts crawled from one website.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactDetails {
    pub url: Option<String>,
    pub domain: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default, rename = "linkedIns")]
    pub linkedins: Vec<String>,
    #[serde(default)]
    pub twitters: Vec<String>,
    #[serde(default)]
    pub instagrams: Vec<String>,
    #[serde(default)]
    pub facebooks: Vec<String>,
}

// --- LinkedIn ---

#[derive(Debug, Clone, Serialize)]
pub struct LinkedInSearchInput {
    #[serde(rename = "searchTerms")]
    pub search_terms: Vec<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
    #[serde(rename = "searchType")]
    pub search_type: String,
}

impl LinkedInSearchInput {
    pub fn people(term: impl Into<String>, max_items: u32) -> Self {
        Self {
            search_terms: vec![term.into()],
            max_items,
            search_type: "people".to_string(),
        }
    }
}

/// A person from the LinkedIn search dataset. Field names vary between actor
/// versions, so most fields carry aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInProfile {
    #[serde(rename = "fullName", alias = "name")]
    pub full_name: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(alias = "title")]
    pub headline: Option<String>,
    #[serde(rename = "currentCompany", alias = "companyName", alias = "company")]
    pub company: Option<String>,
    #[serde(rename = "profileUrl", alias = "url", alias = "linkedInUrl")]
    pub profile_url: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl LinkedInProfile {
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(name.trim().to_string());
        }
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let joined = joined.trim();
        (!joined.is_empty()).then(|| joined.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkedInCompanyInput {
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "maxEmployees")]
    pub max_employees: u32,
    #[serde(rename = "includeContactInfo")]
    pub include_contact_info: bool,
}

/// A staff entry from a LinkedIn company page.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInEmployee {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub company: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub posts: Vec<String>,
}

// --- X/Twitter ---

#[derive(Debug, Clone, Serialize)]
pub struct TwitterProfileInput {
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "includeProfileData")]
    pub include_profile_data: bool,
    #[serde(rename = "maxTweets")]
    pub max_tweets: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterProfile {
    pub name: Option<String>,
    #[serde(alias = "userName")]
    pub username: Option<String>,
    #[serde(default, alias = "description")]
    pub bio: String,
    #[serde(default, alias = "isVerified")]
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_tolerates_sparse_items() {
        let place: Place = serde_json::from_str(
            r#"{"title": "Acme Gym", "website": "https://www.acme.com/", "phones": ["+34 600"]}"#,
        )
        .unwrap();
        assert_eq!(place.display_name(), Some("Acme Gym"));
        assert_eq!(place.first_phone(), Some("+34 600"));
        assert_eq!(place.first_email(), None);
    }

    #[test]
    fn empty_primary_email_falls_back_to_list() {
        let place: Place =
            serde_json::from_str(r#"{"email": "", "emails": ["hola@acme.com"]}"#).unwrap();
        assert_eq!(place.first_email(), Some("hola@acme.com"));
    }

    #[test]
    fn linkedin_profile_name_from_parts() {
        let profile: LinkedInProfile = serde_json::from_str(
            r#"{"firstName": "Ana", "lastName": "Ruiz", "url": "https://linkedin.com/in/anaruiz"}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name().as_deref(), Some("Ana Ruiz"));
        assert_eq!(
            profile.profile_url.as_deref(),
            Some("https://linkedin.com/in/anaruiz")
        );
    }

    #[test]
    fn run_status_parsing() {
        assert_eq!(RunStatus::parse("SUCCEEDED"), RunStatus::Succeeded);
        assert_eq!(RunStatus::parse("TIMED-OUT"), RunStatus::TimedOut);
        assert_eq!(RunStatus::parse("ABORTING"), RunStatus::Running);
    }
}
