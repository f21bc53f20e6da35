//! Progressive source cascade.
//!
//! Sources run in priority order, each raced against its own timeout. A
//! result is validated, then either ends the cascade (confident enough and
//! `stop_on_first_success`) or is kept as best-so-far. Every failure mode of a
//! single source (error, panic, timeout) reads as "no result" and the cascade
//! moves on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use leadscout_common::{DiscoveryLogEntry, DiscoveryResult, DiscoveryStatus, Entity, SourceTag};

use crate::adapters::{
    usable_hint, DomainRegistrationAdapter, FallbackAdapter, PatternGuessAdapter,
    ProfessionalNetworkAdapter, SiteScrapeAdapter, SocialBioAdapter, SourceAdapter, Validator,
    WebSearchAdapter,
};
use crate::progress::ProgressSink;
use crate::providers::{
    DomainProbe, PageFetcher, RegistrationLookup, SearchIndex, SocialProfiles, StaffDirectory,
    Summarizer,
};
use crate::quota::SearchQuota;
use crate::settings::{source_timeout, CascadeSettings};

/// How a single source attempt ended.
#[derive(Debug)]
enum Outcome {
    Found(DiscoveryResult),
    Empty,
    Failed(String),
    TimedOut,
}

struct Source {
    adapter: Arc<dyn SourceAdapter>,
    timeout: Duration,
}

/// Providers backing the standard source order.
pub struct StandardSources {
    pub staff: Arc<dyn StaffDirectory>,
    /// Without a search index the web-search source is left out.
    pub search: Option<Arc<dyn SearchIndex>>,
    pub quota: Arc<SearchQuota>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
    pub probe: Arc<dyn DomainProbe>,
    pub registries: Vec<Arc<dyn RegistrationLookup>>,
    pub social: Arc<dyn SocialProfiles>,
}

pub struct CascadeResolver {
    sources: Vec<Source>,
    validator: Option<Arc<Validator>>,
    settings: CascadeSettings,
    cancelled: Arc<AtomicBool>,
}

impl CascadeResolver {
    pub fn new(settings: CascadeSettings) -> Self {
        Self {
            sources: Vec::new(),
            validator: None,
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Professional network, web search, site scrape, pattern guess, domain
    /// registration, social bio, then the fallback, validated through the
    /// domain probe.
    pub fn standard(settings: CascadeSettings, p: StandardSources) -> Self {
        let mut cascade = Self::new(settings).with_source(Arc::new(ProfessionalNetworkAdapter::new(
            p.staff,
            p.search.clone(),
            p.quota.clone(),
        )));
        if let Some(search) = p.search {
            cascade = cascade.with_source(Arc::new(WebSearchAdapter::new(search, p.quota)));
        }
        cascade
            .with_source(Arc::new(SiteScrapeAdapter::new(p.fetcher, p.summarizer)))
            .with_source(Arc::new(PatternGuessAdapter::new(Some(p.probe.clone()))))
            .with_source(Arc::new(DomainRegistrationAdapter::new(p.registries)))
            .with_source(Arc::new(SocialBioAdapter::new(p.social)))
            .with_source(Arc::new(FallbackAdapter))
            .with_validator(Arc::new(Validator::new(p.probe)))
    }

    /// Append a source with its default timeout.
    pub fn with_source(self, adapter: Arc<dyn SourceAdapter>) -> Self {
        let timeout = source_timeout(adapter.tag());
        self.with_source_timeout(adapter, timeout)
    }

    pub fn with_source_timeout(mut self, adapter: Arc<dyn SourceAdapter>, timeout: Duration) -> Self {
        self.sources.push(Source { adapter, timeout });
        self
    }

    pub fn with_validator(mut self, validator: Arc<Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn source_tags(&self) -> Vec<SourceTag> {
        self.sources.iter().map(|s| s.adapter.tag()).collect()
    }

    pub fn settings(&self) -> &CascadeSettings {
        &self.settings
    }

    /// No further source starts, and a result still in flight is discarded.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Best contact the sources can propose for `entity`, or `None`.
    pub async fn resolve(
        &self,
        entity: Arc<Entity>,
        owner_hint: Option<String>,
        sink: &dyn ProgressSink,
    ) -> Option<DiscoveryResult> {
        if self.is_cancelled() {
            return None;
        }
        info!(
            company = entity.name.as_str(),
            sources = self.sources.len(),
            concurrent = self.settings.concurrent,
            "Starting cascade"
        );

        let best = if self.settings.concurrent {
            self.resolve_concurrent(entity.clone(), owner_hint, sink).await
        } else {
            self.resolve_sequential(entity.clone(), owner_hint, sink).await
        };

        match &best {
            Some(result) => info!(
                company = entity.name.as_str(),
                email = result.email.as_str(),
                source = result.source.as_str(),
                confidence = result.confidence,
                "Cascade resolved"
            ),
            None => {
                let attempts = u32::try_from(self.sources.len()).unwrap_or(u32::MAX);
                let tag = self.sources.last().map_or(SourceTag::Fallback, |s| s.adapter.tag());
                sink.on_discovery_event(&DiscoveryLogEntry::new(
                    attempts,
                    tag,
                    DiscoveryStatus::Failed,
                    format!("No contact found for {}", entity.name),
                ));
                info!(company = entity.name.as_str(), "Cascade found nothing");
            }
        }
        best
    }

    async fn resolve_sequential(
        &self,
        entity: Arc<Entity>,
        owner_hint: Option<String>,
        sink: &dyn ProgressSink,
    ) -> Option<DiscoveryResult> {
        let mut hint = owner_hint;
        let mut best: Option<DiscoveryResult> = None;

        for (index, source) in self.sources.iter().enumerate() {
            if self.is_cancelled() {
                debug!(company = entity.name.as_str(), "Cascade cancelled");
                break;
            }
            if index > 0 && !self.settings.inter_source_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_source_delay).await;
                if self.is_cancelled() {
                    break;
                }
            }

            let attempt = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let tag = source.adapter.tag();
            sink.on_discovery_event(&DiscoveryLogEntry::new(
                attempt,
                tag,
                DiscoveryStatus::Searching,
                format!("Trying {tag} for {}", entity.name),
            ));

            let outcome = run_attempt(source, entity.clone(), hint.clone()).await;
            if self.is_cancelled() {
                debug!(source = tag.as_str(), "Discarding result that arrived after stop");
                break;
            }
            let Some(result) = self.settle(outcome, attempt, tag, sink).await else {
                continue;
            };

            if let Some(name) = usable_hint(Some(&result.owner_name)) {
                hint = Some(name.to_string());
            }

            if self.is_final(&result) {
                return Some(result);
            }
            best = pick_best(best, result);
        }

        best
    }

    async fn resolve_concurrent(
        &self,
        entity: Arc<Entity>,
        owner_hint: Option<String>,
        sink: &dyn ProgressSink,
    ) -> Option<DiscoveryResult> {
        for (index, source) in self.sources.iter().enumerate() {
            let tag = source.adapter.tag();
            sink.on_discovery_event(&DiscoveryLogEntry::new(
                u32::try_from(index + 1).unwrap_or(u32::MAX),
                tag,
                DiscoveryStatus::Searching,
                format!("Trying {tag} for {}", entity.name),
            ));
        }

        let outcomes = join_all(
            self.sources
                .iter()
                .map(|source| run_attempt(source, entity.clone(), owner_hint.clone())),
        )
        .await;

        if self.is_cancelled() {
            return None;
        }

        let mut best: Option<DiscoveryResult> = None;
        for (index, (source, outcome)) in self.sources.iter().zip(outcomes).enumerate() {
            let attempt = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let Some(result) = self.settle(outcome, attempt, source.adapter.tag(), sink).await else {
                continue;
            };
            if self.is_final(&result) {
                return Some(result);
            }
            best = pick_best(best, result);
        }
        best
    }

    /// Report an outcome and turn a found result into a validated one.
    async fn settle(
        &self,
        outcome: Outcome,
        attempt: u32,
        tag: SourceTag,
        sink: &dyn ProgressSink,
    ) -> Option<DiscoveryResult> {
        let mut result = match outcome {
            Outcome::Found(result) => result,
            Outcome::Empty => {
                sink.on_discovery_event(&DiscoveryLogEntry::new(
                    attempt,
                    tag,
                    DiscoveryStatus::Failed,
                    format!("{tag} found nothing"),
                ));
                return None;
            }
            Outcome::Failed(message) => {
                sink.on_discovery_event(&DiscoveryLogEntry::new(
                    attempt,
                    tag,
                    DiscoveryStatus::Failed,
                    format!("{tag} failed: {message}"),
                ));
                return None;
            }
            Outcome::TimedOut => {
                sink.on_discovery_event(&DiscoveryLogEntry::new(
                    attempt,
                    tag,
                    DiscoveryStatus::Failed,
                    format!("{tag} timed out"),
                ));
                return None;
            }
        };
        result.metadata.attempt = attempt;

        if let Some(validator) = &self.validator {
            if self.is_cancelled() {
                return None;
            }
            sink.on_discovery_event(&DiscoveryLogEntry::new(
                attempt,
                validator.tag(),
                DiscoveryStatus::Validating,
                format!("Validating {}", result.email),
            ));
            match tokio::time::timeout(self.settings.validator_timeout, validator.validate(result.clone())).await {
                Ok(validated) => result = validated,
                Err(_) => warn!(email = result.email.as_str(), "Validation timed out, keeping unvalidated result"),
            }
            if self.is_cancelled() {
                return None;
            }
        }

        sink.on_discovery_event(&DiscoveryLogEntry::new(
            attempt,
            tag,
            DiscoveryStatus::Found,
            format!("Found {} ({:.2})", result.email, result.confidence),
        ));
        Some(result)
    }

    fn is_final(&self, result: &DiscoveryResult) -> bool {
        self.settings.stop_on_first_success && result.confidence >= self.settings.min_confidence
    }
}

/// Higher confidence wins; ties keep the earlier result.
fn pick_best(current: Option<DiscoveryResult>, candidate: DiscoveryResult) -> Option<DiscoveryResult> {
    match current {
        Some(current) if current.confidence >= candidate.confidence => Some(current),
        _ => Some(candidate),
    }
}

/// Spawn one attempt and race it against the source's timeout. The task is
/// detached on timeout: it runs to completion and its result is dropped.
async fn run_attempt(source: &Source, entity: Arc<Entity>, hint: Option<String>) -> Outcome {
    let adapter = source.adapter.clone();
    let tag = adapter.tag();
    let handle = tokio::spawn(async move { adapter.attempt(&entity, hint.as_deref()).await });

    match tokio::time::timeout(source.timeout, handle).await {
        Ok(Ok(Ok(Some(result)))) => Outcome::Found(result),
        Ok(Ok(Ok(None))) => Outcome::Empty,
        Ok(Ok(Err(e))) => {
            warn!(source = tag.as_str(), error = %e, "Source attempt failed");
            Outcome::Failed(e.to_string())
        }
        Ok(Err(e)) => {
            warn!(source = tag.as_str(), error = %e, "Source task aborted");
            Outcome::Failed(e.to_string())
        }
        Err(_) => {
            warn!(
                source = tag.as_str(),
                timeout_ms = u64::try_from(source.timeout.as_millis()).unwrap_or(u64::MAX),
                "Source attempt timed out"
            );
            Outcome::TimedOut
        }
    }
}
