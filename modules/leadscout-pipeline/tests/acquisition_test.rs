//! Acquisition loop: over-fetch, filter, enrich, accept, terminate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use leadscout_common::{Lead, Platform, SearchMode, SourceTag};
use leadscout_pipeline::acquisition::{Acquisition, Termination};
use leadscout_pipeline::interpret::InterpretedQuery;
use leadscout_pipeline::progress::RecordingSink;
use leadscout_pipeline::run_log::RunLog;
use leadscout_pipeline::settings::{AcquisitionSettings, CascadeSettings};
use leadscout_pipeline::testing::{lead, MockAdapter, MockContactScraper, MockListing};
use leadscout_pipeline::{CascadeResolver, DedupGuard};

fn query() -> InterpretedQuery {
    InterpretedQuery::fallback("gimnasios")
}

fn with_email(name: &str, domain: &str) -> Lead {
    lead(name, Some(domain), Some(&format!("hola@{domain}")))
}

async fn run(
    acquisition: &Acquisition,
    quota: usize,
    mode: SearchMode,
    guard: &mut DedupGuard,
) -> leadscout_pipeline::acquisition::AcquisitionOutcome {
    let mut log = RunLog::new("run-test", "user-test", "gimnasios");
    acquisition
        .run(&query(), quota, mode, guard, &RecordingSink::new(), &mut log)
        .await
}

#[tokio::test]
async fn stops_as_soon_as_quota_is_met() {
    let listing = Arc::new(MockListing::new(Platform::Maps).then_return(
        (1..=6).map(|i| with_email(&format!("Gym {i}"), &format!("gym{i}.es"))).collect(),
    ));
    let acquisition = Acquisition::new(listing.clone(), AcquisitionSettings::default());
    let mut guard = DedupGuard::new(4);

    let outcome = run(&acquisition, 5, SearchMode::Fast, &mut guard).await;
    assert_eq!(outcome.leads.len(), 5);
    assert_eq!(outcome.stats.termination, Some(Termination::QuotaMet));
    assert_eq!(listing.depths(), vec![20]);
    assert_eq!(guard.len(), 10);
}

#[tokio::test]
async fn terminates_when_an_iteration_brings_nothing_new() {
    let a = with_email("Gym A", "gyma.es");
    let b = with_email("Gym B", "gymb.es");
    let c = with_email("Gym C", "gymc.es");
    let d = lead("Gym D", Some("gymd.es"), None);
    let listing = Arc::new(
        MockListing::new(Platform::Maps)
            .then_return(vec![a.clone(), b.clone()])
            .then_return(vec![a.clone(), b.clone(), c.clone(), d.clone()])
            .then_return(vec![a, b, c, d]),
    );
    let acquisition = Acquisition::new(listing.clone(), AcquisitionSettings::default());

    let outcome = run(&acquisition, 5, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert_eq!(outcome.leads.len(), 3);
    assert_eq!(outcome.stats.termination, Some(Termination::NothingNew));
    assert_eq!(outcome.stats.attempts, 3);
    // needed × 4, accumulated: 5→20, 3→+12, 2→+8
    assert_eq!(listing.depths(), vec![20, 32, 40]);
}

#[tokio::test]
async fn empty_listing_ends_the_run() {
    let listing = Arc::new(MockListing::new(Platform::Maps));
    let acquisition = Acquisition::new(listing, AcquisitionSettings::default());

    let outcome = run(&acquisition, 5, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert!(outcome.leads.is_empty());
    assert_eq!(outcome.stats.termination, Some(Termination::SourceExhausted));
    assert_eq!(outcome.stats.attempts, 1);
}

#[tokio::test]
async fn failed_listing_job_counts_as_an_empty_attempt() {
    let listing = Arc::new(
        MockListing::new(Platform::Maps)
            .then_fail("actor run FAILED")
            .then_return(vec![with_email("Gym A", "gyma.es")]),
    );
    let acquisition = Acquisition::new(listing, AcquisitionSettings::default());

    let outcome = run(&acquisition, 1, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert_eq!(outcome.leads.len(), 1);
    assert_eq!(outcome.stats.failed_fetches, 1);
    assert_eq!(outcome.stats.attempts, 2);
}

#[tokio::test]
async fn never_exceeds_max_attempts() {
    let mut listing = MockListing::new(Platform::Maps);
    for i in 0..10 {
        listing = listing.then_return(vec![lead(&format!("Studio {i}"), None, None)]);
    }
    let listing = Arc::new(listing);
    let settings = AcquisitionSettings::builder().max_attempts(3).build();
    let acquisition = Acquisition::new(listing.clone(), settings);

    let outcome = run(&acquisition, 5, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert!(outcome.leads.is_empty());
    assert_eq!(outcome.stats.termination, Some(Termination::AttemptsExhausted));
    assert_eq!(listing.depths().len(), 3);
}

#[tokio::test]
async fn history_duplicates_are_filtered() {
    let known = with_email("Acme Gym", "acme.com");
    let mut guard = DedupGuard::from_leads([&known], 4);
    let listing = Arc::new(MockListing::new(Platform::Maps).then_return(vec![
        with_email("ACME GYM Madrid", "acme.com"),
        with_email("Blue Yoga", "blueyoga.es"),
    ]));
    let acquisition = Acquisition::new(listing, AcquisitionSettings::default());

    let outcome = run(&acquisition, 2, SearchMode::Fast, &mut guard).await;
    let names: Vec<&str> = outcome.leads.iter().map(|l| l.company_name()).collect();
    assert_eq!(names, vec!["Blue Yoga"]);
    assert_eq!(outcome.stats.history_duplicates, 1);
    assert!(guard.is_duplicate(&outcome.leads[0]));
}

#[tokio::test]
async fn same_company_under_different_websites_is_accepted_once() {
    let listing = Arc::new(MockListing::new(Platform::Maps).then_return(vec![
        with_email("Acme Gym", "acme.com"),
        with_email("Acme Gym", "acme-gym.es"),
        with_email("Acme Gym Madrid", "acmemadrid.es"),
    ]));
    let acquisition = Acquisition::new(listing, AcquisitionSettings::default());
    let mut guard = DedupGuard::new(4);

    let outcome = run(&acquisition, 5, SearchMode::Fast, &mut guard).await;
    let accepted: Vec<(&str, Option<&str>)> = outcome
        .leads
        .iter()
        .map(|l| (l.company_name(), l.website()))
        .collect();
    assert_eq!(accepted, vec![("Acme Gym", Some("acme.com"))]);
    assert_eq!(outcome.stats.run_duplicates, 2);
    assert_eq!(outcome.stats.accepted, 1);
}

#[tokio::test]
async fn contact_scraper_fills_missing_emails_in_batches() {
    let listing = Arc::new(MockListing::new(Platform::Maps).then_return(vec![
        lead("Gym A", Some("gyma.es"), None),
        lead("Gym B", Some("https://www.gymb.es/"), None),
        lead("Gym C", Some("gymc.es"), None),
        lead("Gym D", None, None),
    ]));
    let scraper = Arc::new(
        MockContactScraper::new()
            .on_site("gymb.es", &["noreply@gymb.es", "ana@gymb.es"])
            .on_site("gymc.es", &["info@gymc.es"]),
    );
    let settings = AcquisitionSettings::builder().enrich_batch_size(2).build();
    let acquisition = Acquisition::new(listing, settings).with_scraper(scraper.clone());

    let outcome = run(&acquisition, 5, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    let emails: Vec<&str> = outcome
        .leads
        .iter()
        .filter_map(|l| l.contact.email.as_deref())
        .collect();
    assert_eq!(emails, vec!["ana@gymb.es", "info@gymc.es"]);
    assert_eq!(scraper.batches().len(), 2);
    assert_eq!(outcome.stats.enrichment_batches, 2);
}

#[tokio::test]
async fn failed_enrichment_batch_is_skipped() {
    let listing = Arc::new(
        MockListing::new(Platform::Maps).then_return(vec![lead("Gym A", Some("gyma.es"), None)]),
    );
    let acquisition = Acquisition::new(listing, AcquisitionSettings::default())
        .with_scraper(Arc::new(MockContactScraper::new().failing()));

    let outcome = run(&acquisition, 1, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert!(outcome.leads.is_empty());
    assert_eq!(outcome.stats.failed_batches, 1);
}

#[tokio::test]
async fn deep_mode_resolves_remaining_leads_through_the_cascade() {
    let make_listing = || {
        Arc::new(MockListing::new(Platform::Maps).then_return(vec![lead("Acme Gym", Some("acme.com"), None)]))
    };
    let network = Arc::new(
        MockAdapter::new(SourceTag::ProfessionalNetwork).found("ana.ruiz@acme.com", "Ana Ruiz", 0.75),
    );
    let cascade = Arc::new(
        CascadeResolver::new(CascadeSettings::builder().inter_source_delay(Duration::ZERO).build())
            .with_source(network.clone()),
    );

    let fast = Acquisition::new(make_listing(), AcquisitionSettings::default()).with_cascade(cascade.clone());
    let outcome = run(&fast, 1, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert!(outcome.leads.is_empty());
    assert_eq!(network.calls(), 0);

    let deep = Acquisition::new(make_listing(), AcquisitionSettings::default()).with_cascade(cascade);
    let outcome = run(&deep, 1, SearchMode::Deep, &mut DedupGuard::new(4)).await;
    assert_eq!(outcome.leads.len(), 1);
    let accepted = &outcome.leads[0];
    assert_eq!(accepted.contact.email.as_deref(), Some("ana.ruiz@acme.com"));
    assert_eq!(accepted.contact.name, "Ana Ruiz");
    assert_eq!(accepted.discovery.as_ref().map(|d| d.source), Some(SourceTag::ProfessionalNetwork));
    assert_eq!(outcome.stats.cascade_resolutions, 1);
}

#[tokio::test]
async fn cancelled_run_does_no_work() {
    let listing = Arc::new(MockListing::new(Platform::Maps).then_return(vec![with_email("Gym A", "gyma.es")]));
    let cancelled = Arc::new(AtomicBool::new(false));
    let acquisition = Acquisition::new(listing.clone(), AcquisitionSettings::default()).with_cancel(cancelled.clone());
    cancelled.store(true, Ordering::Relaxed);

    let outcome = run(&acquisition, 1, SearchMode::Fast, &mut DedupGuard::new(4)).await;
    assert_eq!(outcome.stats.termination, Some(Termination::Cancelled));
    assert!(listing.depths().is_empty());
}
