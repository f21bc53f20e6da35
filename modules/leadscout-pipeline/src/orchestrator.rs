//! One lead-generation run, end to end.
//!
//! Validates configuration, seeds the dedup guard from the user's history,
//! interprets the query, drives the acquisition loop, optionally analyzes the
//! accepted leads, then appends them to history and saves the run log. Only a
//! configuration problem is returned as an error; every other failure shrinks
//! the result instead.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use leadscout_common::{Config, Lead, LeadScoutError, Platform, SearchMode};

use crate::acquisition::{Acquisition, AcquisitionStats};
use crate::cascade::CascadeResolver;
use crate::dedup::DedupGuard;
use crate::history::HistoryStore;
use crate::interpret::{analyze_lead, interpret_query, InterpretedQuery};
use crate::progress::ProgressSink;
use crate::providers::{ContactScraper, ListingProvider, Summarizer};
use crate::run_log::RunLog;
use crate::settings::AcquisitionSettings;

/// Collaborators for a run. Nothing here is global; the CLI and tests build
/// their own.
#[derive(TypedBuilder)]
pub struct PipelineDeps {
    pub config: Config,
    pub history: Arc<dyn HistoryStore>,
    /// One listing provider per platform.
    #[builder(default)]
    pub listings: Vec<Arc<dyn ListingProvider>>,
    #[builder(default, setter(strip_option))]
    pub scraper: Option<Arc<dyn ContactScraper>>,
    #[builder(default, setter(strip_option))]
    pub cascade: Option<Arc<CascadeResolver>>,
    #[builder(default, setter(strip_option))]
    pub summarizer: Option<Arc<dyn Summarizer>>,
    #[builder(default)]
    pub settings: AcquisitionSettings,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub user_id: String,
    pub query: String,
    pub quota: usize,
    pub platform: Platform,
    pub mode: SearchMode,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub interpreted: InterpretedQuery,
    pub leads: Vec<Lead>,
    pub stats: AcquisitionStats,
    pub run_log_path: Option<PathBuf>,
}

pub struct Orchestrator {
    deps: PipelineDeps,
    cancelled: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(deps: PipelineDeps) -> Self {
        // The cascade and the loop must observe the same flag.
        let cancelled = deps
            .cascade
            .as_ref()
            .map(|c| c.cancel_flag())
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));
        Self { deps, cancelled }
    }

    pub fn deps(&self) -> &PipelineDeps {
        &self.deps
    }

    /// Stop the current run: no new work starts and in-flight results are dropped.
    pub fn stop(&self) {
        info!("Stop requested");
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn listing_for(&self, platform: Platform) -> Option<Arc<dyn ListingProvider>> {
        self.deps
            .listings
            .iter()
            .find(|l| l.platform() == platform)
            .cloned()
    }

    pub async fn run(
        &self,
        request: RunRequest,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome, LeadScoutError> {
        self.deps.config.validate()?;
        let listing = self.listing_for(request.platform).ok_or_else(|| {
            LeadScoutError::Config(format!("no listing provider for platform {:?}", request.platform))
        })?;
        if request.mode == SearchMode::Deep && self.deps.cascade.is_none() {
            return Err(LeadScoutError::Config(
                "deep search requires a discovery cascade".to_string(),
            ));
        }

        self.cancelled.store(false, Ordering::Relaxed);
        let run_id = Uuid::new_v4().to_string();
        sink.on_run_start(&run_id);
        info!(
            run_id = run_id.as_str(),
            user_id = request.user_id.as_str(),
            query = request.query.as_str(),
            quota = request.quota,
            platform = ?request.platform,
            mode = ?request.mode,
            "Run started"
        );
        sink.on_log(&format!("Searching {} leads for \"{}\"", request.quota, request.query));

        let settings = &self.deps.settings;
        let mut guard = DedupGuard::load(
            self.deps.history.as_ref(),
            &request.user_id,
            settings.history_limit,
            settings.min_fuzzy_len,
        )
        .await;

        let interpreted = interpret_query(
            self.deps.summarizer.as_deref(),
            &request.query,
            request.platform,
        )
        .await;
        sink.on_log(&format!(
            "Interpreted as \"{}\" ({}) in {}",
            interpreted.search_query, interpreted.industry, interpreted.location
        ));

        let mut acquisition = Acquisition::new(listing, settings.clone()).with_cancel(self.cancelled.clone());
        if let Some(scraper) = &self.deps.scraper {
            acquisition = acquisition.with_scraper(scraper.clone());
        }
        if let Some(cascade) = &self.deps.cascade {
            acquisition = acquisition.with_cascade(cascade.clone());
        }

        let mut run_log = RunLog::new(run_id.clone(), request.user_id.clone(), request.query.clone());
        let outcome = acquisition
            .run(&interpreted, request.quota, request.mode, &mut guard, sink, &mut run_log)
            .await;
        let mut leads = outcome.leads;

        if let Some(summarizer) = &self.deps.summarizer {
            self.analyze(summarizer.as_ref(), &mut leads, sink).await;
        }

        if !leads.is_empty() {
            if let Err(e) = self
                .deps
                .history
                .append(&request.user_id, &run_id, &request.query, &leads)
                .await
            {
                let err = LeadScoutError::History(e.to_string());
                warn!(run_id = run_id.as_str(), error = %err, "Failed to append run to history");
                sink.on_log(&format!("Could not save leads to history: {err}"));
            }
        }

        let run_log_path = match run_log.save(&self.deps.config.data_dir, &outcome.stats) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(run_id = run_id.as_str(), error = %e, "Failed to save run log");
                None
            }
        };

        info!(
            run_id = run_id.as_str(),
            accepted = leads.len(),
            quota = request.quota,
            "Run finished"
        );
        Ok(RunOutcome {
            run_id,
            interpreted,
            leads,
            stats: outcome.stats,
            run_log_path,
        })
    }

    async fn analyze(&self, summarizer: &dyn Summarizer, leads: &mut [Lead], sink: &dyn ProgressSink) {
        let limit = self.deps.settings.max_analyzed_leads;
        for lead in leads.iter_mut().take(limit) {
            if self.cancelled.load(Ordering::Relaxed) {
                return;
            }
            sink.on_log(&format!("Analyzing {}", lead.company_name()));
            if let Some(analysis) = analyze_lead(summarizer, lead).await {
                lead.summary = analysis.summary.clone();
                lead.analysis = Some(analysis);
            }
        }
    }
}
