// Test mocks for the lead pipeline.
//
// One mock per trait boundary in `providers` plus a scripted source adapter:
// - MockSummarizer (Summarizer): canned replies keyed by prompt substrings
// - MockFetcher (PageFetcher): HashMap-based URL→body
// - MockProbe (DomainProbe): set of reachable domains, counts calls
// - MockSearch (SearchIndex): HashMap-based query→hits, records queries
// - MockStaffDirectory, MockRegistry, MockSocialProfiles: keyed lookups
// - MockListing (ListingProvider): scripted responses per fetch
// - MockContactScraper (ContactScraper): contacts keyed by domain
// - MockAdapter (SourceAdapter): fixed outcome, optional delay
//
// Plus helpers for building entities and leads.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use leadscout_common::{DiscoveryResult, Entity, Lead, Platform, SourceTag};

use crate::adapters::SourceAdapter;
use crate::interpret::InterpretedQuery;
use crate::providers::{
    ContactScraper, DomainProbe, ListingProvider, PageFetcher, Registration, RegistrationLookup,
    ScrapedContacts, SearchHit, SearchIndex, SocialProfile, SocialProfiles, StaffDirectory,
    StaffMember, Summarizer,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// "Acme Gym" at acme.com, Madrid.
pub fn acme() -> Entity {
    Entity::new("Acme Gym")
        .with_website("acme.com")
        .with_location("Madrid")
}

/// A maps lead with an optional website and email.
pub fn lead(name: &str, website: Option<&str>, email: Option<&str>) -> Lead {
    let mut entity = Entity::new(name);
    entity.website = website.map(str::to_string);
    let mut lead = Lead::new(entity, Platform::Maps);
    lead.contact.fill_email(email);
    lead
}

// ---------------------------------------------------------------------------
// MockSummarizer
// ---------------------------------------------------------------------------

/// Replies with the first rule whose needle occurs in the prompt. Returns
/// `Err` when no rule matches.
#[derive(Default)]
pub struct MockSummarizer {
    by_system: Vec<(String, String)>,
    by_user: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_system_containing(mut self, needle: &str, response: &str) -> Self {
        self.by_system.push((needle.to_string(), response.to_string()));
        self
    }

    pub fn on_user_containing(mut self, needle: &str, response: &str) -> Self {
        self.by_user.push((needle.to_string(), response.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let by_system = self.by_system.iter().find(|(n, _)| system.contains(n.as_str()));
        let by_user = self.by_user.iter().find(|(n, _)| user.contains(n.as_str()));
        match by_system.or(by_user) {
            Some((_, response)) => Ok(response.clone()),
            None => bail!("MockSummarizer: no response registered for prompt"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// HashMap-based page fetcher. Returns `Err` for unregistered URLs.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockFetcher: no page registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// MockProbe
// ---------------------------------------------------------------------------

/// Domain probe that accepts mail only for registered domains.
#[derive(Default)]
pub struct MockProbe {
    reachable: HashSet<String>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reachable(mut self, domain: &str) -> Self {
        self.reachable.insert(domain.to_string());
        self
    }

    /// Every probe returns `Err`.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DomainProbe for MockProbe {
    async fn accepts_mail(&self, domain: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing {
            bail!("MockProbe: resolver unavailable");
        }
        Ok(self.reachable.contains(domain))
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

/// Query→hits map. Unregistered queries return no hits; queries marked with
/// `failing_on` return `Err`. Every query is recorded.
#[derive(Default)]
pub struct MockSearch {
    results: HashMap<String, Vec<SearchHit>>,
    failing: HashSet<String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.results.insert(query.to_string(), hits);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndex for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.to_string());
        }
        if self.failing.contains(query) {
            bail!("MockSearch: search failed for {query}");
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Keyed lookups
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockStaffDirectory {
    staff: HashMap<String, Vec<StaffMember>>,
}

impl MockStaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_company(mut self, company_url: &str, staff: Vec<StaffMember>) -> Self {
        self.staff.insert(company_url.to_string(), staff);
        self
    }
}

#[async_trait]
impl StaffDirectory for MockStaffDirectory {
    async fn staff(&self, company_url: &str) -> Result<Vec<StaffMember>> {
        Ok(self.staff.get(company_url).cloned().unwrap_or_default())
    }
}

/// Registration provider with records for registered domains only.
pub struct MockRegistry {
    name: String,
    records: HashMap<String, Registration>,
}

impl MockRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: HashMap::new(),
        }
    }

    pub fn on_domain(mut self, domain: &str, record: Registration) -> Self {
        self.records.insert(domain.to_string(), record);
        self
    }
}

#[async_trait]
impl RegistrationLookup for MockRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, domain: &str) -> Result<Option<Registration>> {
        Ok(self.records.get(domain).cloned())
    }
}

#[derive(Default)]
pub struct MockSocialProfiles {
    profiles: HashMap<String, SocialProfile>,
}

impl MockSocialProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_handle(mut self, handle: &str, profile: SocialProfile) -> Self {
        self.profiles.insert(handle.to_string(), profile);
        self
    }
}

#[async_trait]
impl SocialProfiles for MockSocialProfiles {
    async fn profile(&self, handle: &str) -> Result<Option<SocialProfile>> {
        Ok(self.profiles.get(handle).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockListing
// ---------------------------------------------------------------------------

enum ListingStep {
    Leads(Vec<Lead>),
    Fail(String),
}

/// Listing provider that plays back scripted responses, one per fetch, then
/// returns nothing. Records the depth of every fetch.
pub struct MockListing {
    platform: Platform,
    script: Mutex<VecDeque<ListingStep>>,
    depths: Mutex<Vec<u32>>,
}

impl MockListing {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            script: Mutex::new(VecDeque::new()),
            depths: Mutex::new(Vec::new()),
        }
    }

    pub fn then_return(self, leads: Vec<Lead>) -> Self {
        if let Ok(mut s) = self.script.lock() {
            s.push_back(ListingStep::Leads(leads));
        }
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        if let Ok(mut s) = self.script.lock() {
            s.push_back(ListingStep::Fail(message.to_string()));
        }
        self
    }

    pub fn depths(&self) -> Vec<u32> {
        self.depths.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ListingProvider for MockListing {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(
        &self,
        _query: &InterpretedQuery,
        depth: u32,
        _cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<Lead>> {
        if let Ok(mut d) = self.depths.lock() {
            d.push(depth);
        }
        let step = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match step {
            Some(ListingStep::Leads(leads)) => Ok(leads),
            Some(ListingStep::Fail(message)) => bail!("MockListing: {message}"),
            None => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockContactScraper
// ---------------------------------------------------------------------------

/// Returns the registered contacts for each requested website's domain.
#[derive(Default)]
pub struct MockContactScraper {
    sites: HashMap<String, ScrapedContacts>,
    failing: bool,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockContactScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_site(mut self, domain: &str, emails: &[&str]) -> Self {
        self.sites.insert(
            domain.to_string(),
            ScrapedContacts {
                domain: domain.to_string(),
                emails: emails.iter().map(|e| e.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContactScraper for MockContactScraper {
    async fn scrape(
        &self,
        websites: &[String],
        _cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<ScrapedContacts>> {
        if let Ok(mut b) = self.batches.lock() {
            b.push(websites.to_vec());
        }
        if self.failing {
            bail!("MockContactScraper: job failed");
        }
        Ok(websites
            .iter()
            .filter_map(|w| leadscout_common::extract_domain(w))
            .filter_map(|d| self.sites.get(&d).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockAdapter
// ---------------------------------------------------------------------------

enum AdapterBehavior {
    Nothing,
    Returns(DiscoveryResult),
    Fails(String),
    Panics,
}

/// Source adapter with a fixed outcome. Records every hint it is given.
pub struct MockAdapter {
    tag: SourceTag,
    behavior: AdapterBehavior,
    delay: Option<Duration>,
    hints: Mutex<Vec<Option<String>>>,
}

impl MockAdapter {
    /// Adapter that finds nothing.
    pub fn new(tag: SourceTag) -> Self {
        Self {
            tag,
            behavior: AdapterBehavior::Nothing,
            delay: None,
            hints: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, result: DiscoveryResult) -> Self {
        self.behavior = AdapterBehavior::Returns(result);
        self
    }

    /// Shorthand for a result tagged with this adapter's source.
    pub fn found(self, email: &str, owner: &str, confidence: f64) -> Self {
        let tag = self.tag;
        self.returning(DiscoveryResult::new(tag, email, owner, "Owner", confidence))
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.behavior = AdapterBehavior::Fails(message.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behavior = AdapterBehavior::Panics;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.hints.lock().map(|h| h.len()).unwrap_or_default()
    }

    pub fn hints(&self) -> Vec<Option<String>> {
        self.hints.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn tag(&self) -> SourceTag {
        self.tag
    }

    async fn attempt(&self, _entity: &Entity, owner_hint: Option<&str>) -> Result<Option<DiscoveryResult>> {
        if let Ok(mut h) = self.hints.lock() {
            h.push(owner_hint.map(str::to_string));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            AdapterBehavior::Nothing => Ok(None),
            AdapterBehavior::Returns(result) => Ok(Some(result.clone())),
            AdapterBehavior::Fails(message) => bail!("MockAdapter: {message}"),
            AdapterBehavior::Panics => panic!("MockAdapter: {} panicked", self.tag),
        }
    }
}
