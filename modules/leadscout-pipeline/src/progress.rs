//! Progress reporting for a pipeline run.
//!
//! Sinks are synchronous and must not block; the default forwards to tracing.

use std::sync::Mutex;

use tracing::info;

use leadscout_common::{DiscoveryLogEntry, DiscoveryStatus};

pub trait ProgressSink: Send + Sync {
    /// A new run begins. Sinks that keep a discovery log clear it here.
    fn on_run_start(&self, _run_id: &str) {}

    /// Free-text operator log line.
    fn on_log(&self, message: &str);

    /// One step of a cascade resolution.
    fn on_discovery_event(&self, entry: &DiscoveryLogEntry);

    /// Accepted leads so far against the run's quota.
    fn on_progress(&self, accepted: usize, quota: usize);
}

/// Sink that writes everything to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_log(&self, message: &str) {
        info!(target: "leadscout::progress", "{message}");
    }

    fn on_discovery_event(&self, entry: &DiscoveryLogEntry) {
        let status = match entry.status {
            DiscoveryStatus::Searching => "searching",
            DiscoveryStatus::Found => "found",
            DiscoveryStatus::Failed => "failed",
            DiscoveryStatus::Validating => "validating",
        };
        info!(
            target: "leadscout::discovery",
            attempt = entry.attempt,
            source = entry.source.as_str(),
            status,
            "{}",
            entry.message
        );
    }

    fn on_progress(&self, accepted: usize, quota: usize) {
        info!(target: "leadscout::progress", accepted, quota, "Progress");
    }
}

/// Sink that keeps every event in memory. Used by the CLI to print a summary
/// and by tests to assert on what a run reported.
#[derive(Debug, Default)]
pub struct RecordingSink {
    logs: Mutex<Vec<String>>,
    discovery: Mutex<Vec<DiscoveryLogEntry>>,
    progress: Mutex<Vec<(usize, usize)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn discovery_log(&self) -> Vec<DiscoveryLogEntry> {
        self.discovery.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().map(|p| p.clone()).unwrap_or_default()
    }

}

impl ProgressSink for RecordingSink {
    fn on_run_start(&self, _run_id: &str) {
        if let Ok(mut d) = self.discovery.lock() {
            d.clear();
        }
    }

    fn on_log(&self, message: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(message.to_string());
        }
    }

    fn on_discovery_event(&self, entry: &DiscoveryLogEntry) {
        if let Ok(mut d) = self.discovery.lock() {
            d.push(entry.clone());
        }
    }

    fn on_progress(&self, accepted: usize, quota: usize) {
        if let Ok(mut p) = self.progress.lock() {
            p.push((accepted, quota));
        }
    }
}
