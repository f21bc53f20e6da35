pub mod error;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use error::{ApifyError, Result};
pub use types::{
    ContactDetails, ContactScraperInput, LinkedInCompanyInput, LinkedInEmployee,
    LinkedInProfile, LinkedInSearchInput, Place, PlacesSearchInput, RunData, RunStatus, StartUrl,
    TwitterProfile, TwitterProfileInput,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for compass/crawler-google-places.
pub const GOOGLE_MAPS_SCRAPER: &str = "nwua9Gu5YrADL7ZDj";

/// Actor ID for vdrmo/contact-details-scraper.
pub const CONTACT_SCRAPER: &str = "vdrmO1lXCkhbPjE9j";

/// People search over LinkedIn.
pub const LINKEDIN_SEARCH: &str = "curious_coder~linkedin-search-scraper";

/// Company page + employee listing.
pub const LINKEDIN_COMPANY_SCRAPER: &str = "apify~linkedin-company-scraper";

/// Profile + latest tweet for a handle.
pub const TWITTER_SCRAPER: &str = "apify~twitter-scraper";

/// Bounds on how long `wait_for_run` keeps polling.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub max_polls: u32,
    pub interval: Duration,
    /// Checked before every poll; once set the wait is abandoned.
    pub cancelled: Option<Arc<AtomicBool>>,
}

impl Default for PollPolicy {
    /// 60 polls × 5s ≈ 5 minute ceiling.
    fn default() -> Self {
        Self {
            max_polls: 60,
            interval: Duration::from_secs(5),
            cancelled: None,
        }
    }
}

impl PollPolicy {
    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch the current state of a run.
    pub async fn run_status(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}", self.base_url, run_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes, at most `policy.max_polls` times.
    pub async fn wait_for_run(&self, run_id: &str, policy: &PollPolicy) -> Result<RunData> {
        for poll in 1..=policy.max_polls {
            if policy.is_cancelled() {
                return Err(ApifyError::Cancelled(run_id.to_string()));
            }
            tokio::time::sleep(policy.interval).await;
            if policy.is_cancelled() {
                return Err(ApifyError::Cancelled(run_id.to_string()));
            }

            let run = self.run_status(run_id).await?;
            match run.run_status() {
                RunStatus::Succeeded => return Ok(run),
                RunStatus::Failed | RunStatus::Aborted | RunStatus::TimedOut => {
                    return Err(ApifyError::RunFailed(run.status));
                }
                RunStatus::Ready | RunStatus::Running => {
                    if poll % 3 == 0 {
                        tracing::info!(run_id, poll, status = %run.status, "Run still in progress");
                    } else {
                        tracing::debug!(run_id, poll, status = %run.status, "Run still in progress");
                    }
                }
            }
        }

        Err(ApifyError::PollExhausted {
            run_id: run_id.to_string(),
            polls: policy.max_polls,
        })
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Run an actor end-to-end: start run, poll, fetch results.
    pub async fn run_actor<I, T>(&self, actor_id: &str, input: &I, policy: &PollPolicy) -> Result<Vec<T>>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(actor_id, run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id, policy).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let items: Vec<T> = self.get_dataset_items(&completed.default_dataset_id).await?;
        tracing::info!(actor_id, count = items.len(), "Fetched dataset items");
        Ok(items)
    }

    /// Google Maps places for a search string, up to `input.max_crawled_places_per_search`.
    pub async fn search_places(&self, input: &PlacesSearchInput, policy: &PollPolicy) -> Result<Vec<Place>> {
        tracing::info!(
            searches = ?input.search_strings_array,
            depth = input.max_crawled_places_per_search,
            "Starting Google Maps places search"
        );
        self.run_actor(GOOGLE_MAPS_SCRAPER, input, policy).await
    }

    /// Emails, phones and social links crawled from a batch of websites.
    pub async fn scrape_contacts(&self, urls: &[String], policy: &PollPolicy) -> Result<Vec<ContactDetails>> {
        tracing::info!(count = urls.len(), "Starting contact details scrape");
        let input = ContactScraperInput::for_urls(urls);
        self.run_actor(CONTACT_SCRAPER, &input, policy).await
    }

    /// LinkedIn people search.
    pub async fn search_linkedin_people(
        &self,
        input: &LinkedInSearchInput,
        policy: &PollPolicy,
    ) -> Result<Vec<LinkedInProfile>> {
        tracing::info!(terms = ?input.search_terms, max_items = input.max_items, "Starting LinkedIn people search");
        self.run_actor(LINKEDIN_SEARCH, input, policy).await
    }

    /// Employees listed on a LinkedIn company page.
    pub async fn linkedin_company_employees(
        &self,
        company_url: &str,
        max_employees: u32,
        policy: &PollPolicy,
    ) -> Result<Vec<LinkedInEmployee>> {
        tracing::info!(company_url, max_employees, "Starting LinkedIn company scrape");
        let input = LinkedInCompanyInput {
            start_urls: vec![StartUrl {
                url: company_url.to_string(),
            }],
            max_employees,
            include_contact_info: true,
        };
        self.run_actor(LINKEDIN_COMPANY_SCRAPER, &input, policy).await
    }

    /// Profile data (bio, display name, verification) for one X/Twitter handle.
    pub async fn twitter_profile(&self, handle: &str, policy: &PollPolicy) -> Result<Option<TwitterProfile>> {
        tracing::info!(handle, "Starting X/Twitter profile scrape");
        let input = TwitterProfileInput {
            start_urls: vec![StartUrl {
                url: format!("https://twitter.com/{handle}"),
            }],
            include_profile_data: true,
            max_tweets: 1,
        };
        let profiles: Vec<TwitterProfile> = self.run_actor(TWITTER_SCRAPER, &input, policy).await?;
        Ok(profiles.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_policy_caps_at_five_minutes() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval * policy.max_polls, Duration::from_secs(300));
        assert!(!policy.is_cancelled());
    }

    #[test]
    fn poll_policy_sees_cancellation() {
        let flag = Arc::new(AtomicBool::new(false));
        let policy = PollPolicy::default().with_cancel(flag.clone());
        assert!(!policy.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(policy.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wait_returns_without_network() {
        let flag = Arc::new(AtomicBool::new(true));
        let policy = PollPolicy::default().with_cancel(flag);
        let client = ApifyClient::new("token".into()).with_base_url("http://127.0.0.1:9");
        let err = client.wait_for_run("run-1", &policy).await.unwrap_err();
        assert!(matches!(err, ApifyError::Cancelled(_)));
    }

    #[test]
    fn job_failures_are_distinguished_from_transport_errors() {
        assert!(ApifyError::RunFailed("FAILED".into()).is_job_failure());
        assert!(ApifyError::PollExhausted { run_id: "r".into(), polls: 60 }.is_job_failure());
        assert!(!ApifyError::Network("refused".into()).is_job_failure());
    }
}
