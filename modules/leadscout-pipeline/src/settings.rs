//! Tuning for the cascade and the acquisition loop.

use std::time::Duration;

use typed_builder::TypedBuilder;

use leadscout_common::{Config, SourceTag};

#[derive(Debug, Clone, TypedBuilder)]
pub struct CascadeSettings {
    /// A result at or above this confidence may end the cascade.
    #[builder(default = 0.5)]
    pub min_confidence: f64,
    /// When false every source runs and the most confident result wins.
    #[builder(default = true)]
    pub stop_on_first_success: bool,
    /// Pause between sequential sources.
    #[builder(default = Duration::from_millis(500))]
    pub inter_source_delay: Duration,
    /// Run every source at once instead of one after another.
    #[builder(default = false)]
    pub concurrent: bool,
    #[builder(default = Duration::from_secs(10))]
    pub validator_timeout: Duration,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Per-source attempt timeout.
pub fn source_timeout(tag: SourceTag) -> Duration {
    match tag {
        SourceTag::ProfessionalNetwork => Duration::from_secs(15),
        SourceTag::WebSearch => Duration::from_secs(5),
        SourceTag::SiteScrape => Duration::from_secs(8),
        SourceTag::PatternGuess => Duration::from_secs(2),
        SourceTag::DomainRegistration => Duration::from_secs(3),
        SourceTag::SocialBio => Duration::from_secs(12),
        SourceTag::Validator => Duration::from_secs(10),
        SourceTag::Fallback => Duration::from_secs(1),
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct AcquisitionSettings {
    #[builder(default = 10)]
    pub max_attempts: u32,
    /// Listings requested per lead still needed.
    #[builder(default = 4)]
    pub fetch_multiplier: u32,
    /// Websites sent to the contact scraper per job.
    #[builder(default = 10)]
    pub enrich_batch_size: usize,
    /// Past leads loaded into the dedup guard.
    #[builder(default = 500)]
    pub history_limit: usize,
    /// Keys shorter than this never match by containment.
    #[builder(default = 4)]
    pub min_fuzzy_len: usize,
    /// Accepted leads that get an AI analysis.
    #[builder(default = 10)]
    pub max_analyzed_leads: usize,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AcquisitionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self::builder().max_attempts(config.max_attempts).build()
    }
}
