//! Lead run log: persisted JSON timeline of every step of an acquisition run.
//!
//! Each run produces a single `{DATA_DIR}/lead-runs/{user}/{run_id}.json` file
//! containing an ordered list of events with timestamps.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::acquisition::{AcquisitionStats, Termination};

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

pub struct RunLog {
    pub run_id: String,
    pub user_id: String,
    pub query: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Debug, Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ListingFetched {
        attempt: u32,
        depth: u32,
        raw_count: usize,
    },
    ListingFailed {
        attempt: u32,
        error: String,
    },
    DuplicatesFiltered {
        attempt: u32,
        history_matches: usize,
        seen_in_run: usize,
        survivors: usize,
    },
    EnrichmentBatch {
        websites: usize,
        contacts_found: usize,
        success: bool,
    },
    CascadeResolved {
        company: String,
        source: Option<String>,
        confidence: Option<f64>,
    },
    LeadAccepted {
        company: String,
        email: String,
    },
    Terminated {
        reason: Termination,
        accepted: usize,
    },
}

impl RunLog {
    pub fn new(run_id: impl Into<String>, user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            user_id: user_id.into(),
            query: query.into(),
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    pub fn events(&self) -> impl Iterator<Item = &EventKind> {
        self.events.iter().map(|e| &e.kind)
    }

    /// Serialize the run log to JSON and write it under `data_dir`.
    /// Returns the file path on success.
    pub fn save(&self, data_dir: &Path, stats: &AcquisitionStats) -> Result<PathBuf> {
        let dir = data_dir.join("lead-runs").join(sanitize(&self.user_id));
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", self.run_id));

        let output = SerializedRunLog {
            run_id: &self.run_id,
            user_id: &self.user_id,
            query: &self.query,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats,
            events: &self.events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)?;
        info!(path = %path.display(), events = self.events.len(), "Lead run log saved");

        Ok(path)
    }
}

/// User ids become directory names.
fn sanitize(user_id: &str) -> String {
    let cleaned: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    user_id: &'a str,
    query: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: &'a AcquisitionStats,
    events: &'a [RunEvent],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_sequenced() {
        let mut log = RunLog::new("run-1", "user-1", "gimnasios");
        log.log(EventKind::ListingFetched { attempt: 1, depth: 20, raw_count: 12 });
        log.log(EventKind::Terminated { reason: Termination::QuotaMet, accepted: 5 });
        assert_eq!(log.events().count(), 2);
        assert_eq!(log.events[1].seq, 1);
    }

    #[test]
    fn saves_under_user_directory() {
        let dir = std::env::temp_dir().join(format!("leadscout-runlog-{}", uuid::Uuid::new_v4()));
        let mut log = RunLog::new("run-1", "user/1", "gimnasios");
        log.log(EventKind::LeadAccepted {
            company: "Acme Gym".to_string(),
            email: "ana@acme.com".to_string(),
        });
        let path = log.save(&dir, &AcquisitionStats::default()).unwrap();
        assert!(path.ends_with("lead-runs/user_1/run-1.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["events"][0]["type"], "lead_accepted");
        assert_eq!(written["events"][0]["company"], "Acme Gym");
        std::fs::remove_dir_all(&dir).ok();
    }
}
