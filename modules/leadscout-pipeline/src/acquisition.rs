//! Quota-driven acquisition loop.
//!
//! Each iteration over-fetches from the listing provider (crawl depth grows
//! across iterations), drops candidates already known to the user or already
//! seen in this run, enriches the survivors, and accepts those with an email
//! until the quota is met. Iterations are strictly sequential so the dedup
//! guard always reflects every earlier accept.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use leadscout_common::{extract_domain, name_key, website_key, Entity, Lead, SearchMode};

use crate::cascade::CascadeResolver;
use crate::dedup::DedupGuard;
use crate::interpret::InterpretedQuery;
use crate::patterns::filter_spam;
use crate::progress::ProgressSink;
use crate::providers::{ContactScraper, ListingProvider, ScrapedContacts};
use crate::run_log::{EventKind, RunLog};
use crate::settings::AcquisitionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    QuotaMet,
    /// The provider returned nothing at all.
    SourceExhausted,
    /// Everything returned was already seen in this run.
    NothingNew,
    AttemptsExhausted,
    Cancelled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Termination::QuotaMet => "quota met",
            Termination::SourceExhausted => "source exhausted",
            Termination::NothingNew => "no new candidates",
            Termination::AttemptsExhausted => "attempts exhausted",
            Termination::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AcquisitionStats {
    pub attempts: u32,
    pub failed_fetches: u32,
    pub raw_listings: usize,
    pub history_duplicates: usize,
    pub run_duplicates: usize,
    pub enrichment_batches: u32,
    pub failed_batches: u32,
    pub cascade_resolutions: u32,
    pub accepted: usize,
    pub termination: Option<Termination>,
}

/// Mutable state of one run; discarded when the run ends.
struct RunState {
    quota: usize,
    attempt: u32,
    depth: u32,
    seen: HashSet<String>,
    accepted: Vec<Lead>,
}

impl RunState {
    fn new(quota: usize) -> Self {
        Self {
            quota,
            attempt: 0,
            depth: 0,
            seen: HashSet::new(),
            accepted: Vec::new(),
        }
    }

    fn needed(&self) -> usize {
        self.quota.saturating_sub(self.accepted.len())
    }
}

/// In-run identity of a candidate: its website if it has one, else its name.
fn run_key(lead: &Lead) -> Option<String> {
    lead.website()
        .and_then(website_key)
        .or_else(|| name_key(lead.company_name()))
}

pub struct AcquisitionOutcome {
    pub leads: Vec<Lead>,
    pub stats: AcquisitionStats,
}

pub struct Acquisition {
    listing: Arc<dyn ListingProvider>,
    scraper: Option<Arc<dyn ContactScraper>>,
    cascade: Option<Arc<CascadeResolver>>,
    settings: AcquisitionSettings,
    cancelled: Arc<AtomicBool>,
}

impl Acquisition {
    pub fn new(listing: Arc<dyn ListingProvider>, settings: AcquisitionSettings) -> Self {
        Self {
            listing,
            scraper: None,
            cascade: None,
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_scraper(mut self, scraper: Arc<dyn ContactScraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    pub fn with_cascade(mut self, cascade: Arc<CascadeResolver>) -> Self {
        self.cascade = Some(cascade);
        self
    }

    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub async fn run(
        &self,
        query: &InterpretedQuery,
        quota: usize,
        mode: SearchMode,
        guard: &mut DedupGuard,
        sink: &dyn ProgressSink,
        log: &mut RunLog,
    ) -> AcquisitionOutcome {
        let mut state = RunState::new(quota);
        let mut stats = AcquisitionStats::default();

        let termination = loop {
            if state.needed() == 0 {
                break Termination::QuotaMet;
            }
            if state.attempt >= self.settings.max_attempts {
                break Termination::AttemptsExhausted;
            }
            if self.is_cancelled() {
                break Termination::Cancelled;
            }

            state.attempt += 1;
            let fetch_amount = u32::try_from(state.needed())
                .unwrap_or(u32::MAX)
                .saturating_mul(self.settings.fetch_multiplier);
            state.depth = state.depth.saturating_add(fetch_amount);
            stats.attempts = state.attempt;

            sink.on_log(&format!(
                "Attempt {}/{}: fetching {} listings (depth {})",
                state.attempt, self.settings.max_attempts, fetch_amount, state.depth
            ));
            info!(
                attempt = state.attempt,
                needed = state.needed(),
                depth = state.depth,
                platform = ?self.listing.platform(),
                "Fetching listings"
            );

            // Fetch
            let raw = match self.listing.fetch(query, state.depth, &self.cancelled).await {
                Ok(raw) => raw,
                Err(e) => {
                    if self.is_cancelled() {
                        break Termination::Cancelled;
                    }
                    warn!(attempt = state.attempt, error = %e, "Listing job failed, counting attempt as empty");
                    sink.on_log(&format!("Listing job failed: {e}"));
                    log.log(EventKind::ListingFailed {
                        attempt: state.attempt,
                        error: e.to_string(),
                    });
                    stats.failed_fetches += 1;
                    continue;
                }
            };
            log.log(EventKind::ListingFetched {
                attempt: state.attempt,
                depth: state.depth,
                raw_count: raw.len(),
            });
            stats.raw_listings += raw.len();
            if raw.is_empty() {
                sink.on_log("Listing source returned nothing, stopping");
                break Termination::SourceExhausted;
            }

            // Filter
            let mut unseen = 0usize;
            let mut history_matches = 0usize;
            let mut seen_in_run = 0usize;
            let mut survivors = Vec::new();
            for lead in raw {
                let Some(key) = run_key(&lead) else {
                    continue;
                };
                if !state.seen.insert(key) {
                    seen_in_run += 1;
                    continue;
                }
                unseen += 1;
                if guard.is_duplicate(&lead) {
                    history_matches += 1;
                    continue;
                }
                survivors.push(lead);
            }
            stats.history_duplicates += history_matches;
            stats.run_duplicates += seen_in_run;
            log.log(EventKind::DuplicatesFiltered {
                attempt: state.attempt,
                history_matches,
                seen_in_run,
                survivors: survivors.len(),
            });
            debug!(unseen, history_matches, seen_in_run, survivors = survivors.len(), "Filtered listings");
            if unseen == 0 {
                sink.on_log("No new candidates in this batch, stopping");
                break Termination::NothingNew;
            }
            if history_matches > 0 {
                sink.on_log(&format!("Skipped {history_matches} companies already delivered"));
            }

            // Enrich
            self.enrich(&mut survivors, &mut stats, log).await;
            if self.is_cancelled() {
                break Termination::Cancelled;
            }
            if mode == SearchMode::Deep {
                self.resolve(&mut survivors, state.needed(), &mut stats, sink, log).await;
                if self.is_cancelled() {
                    break Termination::Cancelled;
                }
            }

            // Accept
            for lead in survivors.into_iter().filter(|l| l.contact.has_email()) {
                if state.needed() == 0 {
                    break;
                }
                // Earlier accepts in this batch may cover the same company.
                if guard.is_duplicate(&lead) {
                    stats.run_duplicates += 1;
                    debug!(company = lead.company_name(), "Skipped duplicate of a lead accepted this run");
                    continue;
                }
                guard.record(&lead);
                log.log(EventKind::LeadAccepted {
                    company: lead.company_name().to_string(),
                    email: lead.contact.email.clone().unwrap_or_default(),
                });
                state.accepted.push(lead);
                sink.on_progress(state.accepted.len(), state.quota);
            }
            info!(
                attempt = state.attempt,
                accepted = state.accepted.len(),
                quota = state.quota,
                "Attempt complete"
            );
        };

        stats.accepted = state.accepted.len();
        stats.termination = Some(termination);
        log.log(EventKind::Terminated {
            reason: termination,
            accepted: state.accepted.len(),
        });
        sink.on_log(&format!(
            "Acquisition finished ({termination}): {}/{} leads",
            state.accepted.len(),
            state.quota
        ));
        info!(
            accepted = state.accepted.len(),
            quota = state.quota,
            attempts = state.attempt,
            %termination,
            "Acquisition finished"
        );

        AcquisitionOutcome {
            leads: state.accepted,
            stats,
        }
    }

    /// Scrape websites of survivors that still lack an email, in batches.
    /// A failed batch is logged and skipped.
    async fn enrich(&self, survivors: &mut [Lead], stats: &mut AcquisitionStats, log: &mut RunLog) {
        let Some(scraper) = &self.scraper else {
            return;
        };
        let pending: Vec<usize> = survivors
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.contact.has_email() && l.website().is_some())
            .map(|(i, _)| i)
            .collect();

        for batch in pending.chunks(self.settings.enrich_batch_size.max(1)) {
            if self.is_cancelled() {
                return;
            }
            let websites: Vec<String> = batch
                .iter()
                .filter_map(|&i| survivors[i].website().map(str::to_string))
                .collect();
            stats.enrichment_batches += 1;

            match scraper.scrape(&websites, &self.cancelled).await {
                Ok(contacts) => {
                    let mut found = 0usize;
                    for &i in batch {
                        if apply_contacts(&mut survivors[i], &contacts) {
                            found += 1;
                        }
                    }
                    log.log(EventKind::EnrichmentBatch {
                        websites: websites.len(),
                        contacts_found: found,
                        success: true,
                    });
                    debug!(websites = websites.len(), found, "Enrichment batch complete");
                }
                Err(e) => {
                    stats.failed_batches += 1;
                    warn!(websites = websites.len(), error = %e, "Enrichment batch failed, skipping");
                    log.log(EventKind::EnrichmentBatch {
                        websites: websites.len(),
                        contacts_found: 0,
                        success: false,
                    });
                }
            }
        }
    }

    /// Run the cascade for survivors still without email, stopping once
    /// enough candidates have one.
    async fn resolve(
        &self,
        survivors: &mut [Lead],
        needed: usize,
        stats: &mut AcquisitionStats,
        sink: &dyn ProgressSink,
        log: &mut RunLog,
    ) {
        let Some(cascade) = &self.cascade else {
            return;
        };
        for i in 0..survivors.len() {
            if survivors.iter().filter(|l| l.contact.has_email()).count() >= needed {
                return;
            }
            if self.is_cancelled() {
                return;
            }
            let lead = &mut survivors[i];
            if lead.contact.has_email() {
                continue;
            }

            let entity: Arc<Entity> = Arc::new(lead.entity.clone());
            let hint = Some(lead.contact.name.trim().to_string()).filter(|n| !n.is_empty());
            sink.on_log(&format!("Searching owner contact for {}", lead.company_name()));
            let result = cascade.resolve(entity, hint, sink).await;
            stats.cascade_resolutions += 1;

            log.log(EventKind::CascadeResolved {
                company: lead.company_name().to_string(),
                source: result.as_ref().map(|r| r.source.as_str().to_string()),
                confidence: result.as_ref().map(|r| r.confidence),
            });
            if let Some(result) = result {
                lead.contact.absorb(&result);
                lead.discovery = Some(result);
            }
        }
    }
}

/// Fill a lead's empty contact fields from the scraped site matching its
/// domain. Returns whether an email was added.
fn apply_contacts(lead: &mut Lead, contacts: &[ScrapedContacts]) -> bool {
    let Some(domain) = lead.entity.domain() else {
        return false;
    };
    let Some(found) = contacts
        .iter()
        .find(|c| extract_domain(&c.domain).as_deref() == Some(domain.as_str()))
    else {
        return false;
    };

    let had_email = lead.contact.has_email();
    let email = filter_spam(found.emails.clone()).into_iter().next();
    lead.contact.fill_email(email.as_deref());
    lead.contact.fill_phone(found.phones.first().map(String::as_str));
    lead.contact.fill_linkedin(found.linkedin.as_deref());
    !had_email && lead.contact.has_email()
}
