//! Daily autopilot: runs one acquisition at a scheduled local time.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::quota::SearchQuota;

pub const MIN_LEADS: u32 = 1;
pub const MAX_LEADS: u32 = 50;
/// Minutes after the scheduled time during which a run may still start.
pub const TRIGGER_WINDOW_MINUTES: i64 = 5;
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Local time as "HH:MM".
    #[serde(default = "default_time")]
    pub scheduled_time: String,
    #[serde(default = "default_quantity")]
    pub leads_quantity: u32,
    #[serde(default)]
    pub last_run_date: Option<NaiveDate>,
}

fn default_time() -> String {
    "09:00".to_string()
}

fn default_quantity() -> u32 {
    10
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scheduled_time: default_time(),
            leads_quantity: default_quantity(),
            last_run_date: None,
        }
    }
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

impl AutopilotConfig {
    pub fn enable(&mut self, time: &str, quantity: u32) -> Result<()> {
        let parsed = parse_time(time).with_context(|| format!("invalid time {time:?}, expected HH:MM"))?;
        self.enabled = true;
        self.scheduled_time = parsed.format("%H:%M").to_string();
        self.set_quantity(quantity);
        Ok(())
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.leads_quantity = quantity.clamp(MIN_LEADS, MAX_LEADS);
    }

    pub fn has_run_on(&self, day: NaiveDate) -> bool {
        self.last_run_date == Some(day)
    }

    /// Allow another run today.
    pub fn reset_last_run(&mut self) {
        self.last_run_date = None;
    }

    /// Enabled, not yet run today, and `now` falls within the window after
    /// the scheduled time.
    pub fn should_trigger(&self, now: NaiveDateTime) -> bool {
        if !self.enabled || self.has_run_on(now.date()) {
            return false;
        }
        let Some(target) = parse_time(&self.scheduled_time) else {
            return false;
        };
        let current = i64::from(now.hour() * 60 + now.minute());
        let scheduled = i64::from(target.hour() * 60 + target.minute());
        (0..=TRIGGER_WINDOW_MINUTES).contains(&(current - scheduled))
    }

    /// Record today's run before it starts, so a slow run never fires twice.
    pub fn mark_triggered(&mut self, day: NaiveDate) {
        self.last_run_date = Some(day);
    }

    /// Missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.set_quantity(config.leads_quantity);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Scheduler loop state. Owns the config file and the shared search quota,
/// which it resets whenever the local date changes.
pub struct Autopilot {
    config_path: PathBuf,
    quota: Arc<SearchQuota>,
    current_day: Option<NaiveDate>,
}

impl Autopilot {
    pub fn new(config_path: PathBuf, quota: Arc<SearchQuota>) -> Self {
        Self {
            config_path,
            quota,
            current_day: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// One scheduler check. Returns the number of leads to search for when a
    /// run is due.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<u32> {
        let today = now.date();
        if self.current_day.is_some_and(|day| day != today) {
            self.quota.reset_daily_counter();
        }
        self.current_day = Some(today);

        let mut config = match AutopilotConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Autopilot config unreadable, skipping check");
                return None;
            }
        };
        if !config.should_trigger(now) {
            return None;
        }

        config.mark_triggered(today);
        if let Err(e) = config.save(&self.config_path) {
            warn!(error = %e, "Failed to persist autopilot run date");
        }
        info!(
            scheduled_time = config.scheduled_time.as_str(),
            leads = config.leads_quantity,
            "Autopilot triggered"
        );
        Some(config.leads_quantity)
    }

    /// Check every `CHECK_INTERVAL` until cancelled, awaiting `on_trigger`
    /// for each due run.
    pub async fn run<F, Fut>(&mut self, cancelled: Arc<AtomicBool>, mut on_trigger: F)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!(config = %self.config_path.display(), "Autopilot monitoring started");
        while !cancelled.load(Ordering::Relaxed) {
            if let Some(quantity) = self.tick(Local::now().naive_local()) {
                on_trigger(quantity).await;
            }
            tokio::time::sleep(CHECK_INTERVAL).await;
        }
        info!("Autopilot stopped");
    }
}
