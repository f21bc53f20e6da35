//! End-to-end runs through the orchestrator with mocked providers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use leadscout_common::{Config, Lead, LeadScoutError, Platform, SearchMode};
use leadscout_pipeline::cascade::StandardSources;
use leadscout_pipeline::history::{HistoryStore, MemoryHistoryStore};
use leadscout_pipeline::progress::RecordingSink;
use leadscout_pipeline::providers::ListingProvider;
use leadscout_pipeline::quota::SearchQuota;
use leadscout_pipeline::settings::CascadeSettings;
use leadscout_pipeline::testing::{
    lead, MockFetcher, MockListing, MockProbe, MockSocialProfiles, MockStaffDirectory, MockSummarizer,
};
use leadscout_pipeline::{CascadeResolver, Orchestrator, PipelineDeps, RunRequest};

fn request(quota: usize, mode: SearchMode) -> RunRequest {
    RunRequest {
        user_id: "user-1".to_string(),
        query: "gimnasios en Madrid".to_string(),
        quota,
        platform: Platform::Maps,
        mode,
    }
}

fn listings(listing: Arc<MockListing>) -> Vec<Arc<dyn ListingProvider>> {
    vec![listing as Arc<dyn ListingProvider>]
}

fn standard_cascade() -> Arc<CascadeResolver> {
    Arc::new(CascadeResolver::standard(
        CascadeSettings::builder().inter_source_delay(Duration::ZERO).build(),
        StandardSources {
            staff: Arc::new(MockStaffDirectory::new()),
            search: None,
            quota: Arc::new(SearchQuota::new(100)),
            fetcher: Arc::new(MockFetcher::new()),
            summarizer: None,
            probe: Arc::new(MockProbe::new()),
            registries: Vec::new(),
            social: Arc::new(MockSocialProfiles::new()),
        },
    ))
}

struct BrokenHistory;

#[async_trait]
impl HistoryStore for BrokenHistory {
    async fn query(&self, _user_id: &str, _limit: usize) -> Result<Vec<Lead>> {
        Ok(Vec::new())
    }

    async fn append(&self, _user_id: &str, _run_id: &str, _query: &str, _leads: &[Lead]) -> Result<()> {
        bail!("connection refused")
    }
}

#[tokio::test]
async fn acme_gym_deep_run_finds_an_acme_contact() {
    let listing = MockListing::new(Platform::Maps).then_return(vec![lead("Acme Gym", Some("acme.com"), None)]);
    let history = Arc::new(MemoryHistoryStore::new());
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(Config::for_tests())
            .history(history.clone())
            .listings(listings(Arc::new(listing)))
            .cascade(standard_cascade())
            .build(),
    );

    let sink = RecordingSink::new();
    let outcome = orchestrator.run(request(1, SearchMode::Deep), &sink).await.unwrap();

    assert_eq!(outcome.leads.len(), 1);
    let acme = &outcome.leads[0];
    assert!(acme.contact.email.as_deref().is_some_and(|e| e.ends_with("@acme.com")));
    let discovery = acme.discovery.as_ref().expect("deep run records the discovery");
    assert!(discovery.confidence > 0.0);
    assert_eq!(history.count("user-1"), 1);
    assert!(!sink.discovery_log().is_empty());
    assert!(outcome.run_log_path.as_ref().is_some_and(|p| p.exists()));
}

#[tokio::test]
async fn acme_gym_in_history_is_excluded() {
    let history = Arc::new(MemoryHistoryStore::with_leads(
        "user-1",
        vec![lead("Acme Gym", Some("acme.com"), Some("ana@acme.com"))],
    ));
    let listing = MockListing::new(Platform::Maps).then_return(vec![
        lead("Acme Gym", Some("https://www.acme.com"), Some("hola@acme.com")),
        lead("Blue Yoga", Some("blueyoga.es"), Some("hola@blueyoga.es")),
    ]);
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(Config::for_tests())
            .history(history.clone())
            .listings(listings(Arc::new(listing)))
            .build(),
    );

    let outcome = orchestrator
        .run(request(5, SearchMode::Fast), &RecordingSink::new())
        .await
        .unwrap();
    let names: Vec<&str> = outcome.leads.iter().map(|l| l.company_name()).collect();
    assert_eq!(names, vec!["Blue Yoga"]);
    assert_eq!(history.count("user-1"), 2);
}

#[tokio::test]
async fn missing_credentials_fail_before_any_work() {
    let listing = Arc::new(MockListing::new(Platform::Maps));
    let mut config = Config::for_tests();
    config.apify_api_token = String::new();
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(config)
            .history(Arc::new(MemoryHistoryStore::new()))
            .listings(listings(listing.clone()))
            .build(),
    );

    let err = orchestrator
        .run(request(5, SearchMode::Fast), &RecordingSink::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LeadScoutError::Config(msg) if msg.contains("APIFY_API_TOKEN")));
    assert!(listing.depths().is_empty());
}

#[tokio::test]
async fn unsupported_platform_and_deep_without_cascade_are_config_errors() {
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(Config::for_tests())
            .history(Arc::new(MemoryHistoryStore::new()))
            .listings(listings(Arc::new(MockListing::new(Platform::Maps))))
            .build(),
    );

    let mut linkedin = request(5, SearchMode::Fast);
    linkedin.platform = Platform::LinkedIn;
    assert!(matches!(
        orchestrator.run(linkedin, &RecordingSink::new()).await,
        Err(LeadScoutError::Config(_))
    ));
    assert!(matches!(
        orchestrator.run(request(5, SearchMode::Deep), &RecordingSink::new()).await,
        Err(LeadScoutError::Config(_))
    ));
}

#[tokio::test]
async fn history_failure_is_logged_not_raised() {
    let listing = MockListing::new(Platform::Maps).then_return(vec![lead("Blue Yoga", Some("blueyoga.es"), Some("hola@blueyoga.es"))]);
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(Config::for_tests())
            .history(Arc::new(BrokenHistory))
            .listings(listings(Arc::new(listing)))
            .build(),
    );

    let sink = RecordingSink::new();
    let outcome = orchestrator.run(request(1, SearchMode::Fast), &sink).await.unwrap();
    assert_eq!(outcome.leads.len(), 1);
    assert!(sink.logs().iter().any(|l| l.contains("Could not save leads to history")));
}

#[tokio::test]
async fn summarizer_interprets_query_and_analyzes_leads() {
    let listing = MockListing::new(Platform::Maps).then_return(vec![lead("Blue Yoga", Some("blueyoga.es"), Some("hola@blueyoga.es"))]);
    let summarizer = MockSummarizer::new()
        .on_system_containing(
            "B2B prospecting expert",
            r#"{"searchQuery": "estudio de yoga", "industry": "Wellness", "targetRoles": ["Owner"], "location": "Madrid"}"#,
        )
        .on_system_containing(
            "sales analysis",
            r#"{"summary": "Yoga studio with strong reviews", "painPoints": ["booking"], "entryAngle": "online booking"}"#,
        );
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(Config::for_tests())
            .history(Arc::new(MemoryHistoryStore::new()))
            .listings(listings(Arc::new(listing)))
            .summarizer(Arc::new(summarizer))
            .build(),
    );

    let outcome = orchestrator
        .run(request(1, SearchMode::Fast), &RecordingSink::new())
        .await
        .unwrap();
    assert_eq!(outcome.interpreted.search_query, "estudio de yoga");
    assert_eq!(outcome.interpreted.location, "Madrid");
    let analyzed = &outcome.leads[0];
    assert_eq!(analyzed.summary, "Yoga studio with strong reviews");
    assert_eq!(
        analyzed.analysis.as_ref().map(|a| a.entry_angle.as_str()),
        Some("online booking")
    );
}

#[tokio::test]
async fn discovery_log_is_cleared_at_run_start() {
    let listing = MockListing::new(Platform::Maps)
        .then_return(vec![lead("Acme Gym", Some("acme.com"), None)])
        .then_return(vec![lead("Blue Yoga", Some("blueyoga.es"), Some("hola@blueyoga.es"))]);
    let orchestrator = Orchestrator::new(
        PipelineDeps::builder()
            .config(Config::for_tests())
            .history(Arc::new(MemoryHistoryStore::new()))
            .listings(listings(Arc::new(listing)))
            .cascade(standard_cascade())
            .build(),
    );

    let sink = RecordingSink::new();
    orchestrator.run(request(1, SearchMode::Deep), &sink).await.unwrap();
    assert!(!sink.discovery_log().is_empty());

    // Second run accepts a lead that already has an email: no cascade events.
    orchestrator.run(request(1, SearchMode::Deep), &sink).await.unwrap();
    assert!(sink.discovery_log().is_empty());
}
