pub mod acquisition;
pub mod adapters;
pub mod autopilot;
pub mod cascade;
pub mod confidence;
pub mod dedup;
pub mod history;
pub mod interpret;
pub mod orchestrator;
pub mod patterns;
pub mod progress;
pub mod providers;
pub mod quota;
pub mod run_log;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use cascade::CascadeResolver;
pub use dedup::DedupGuard;
pub use orchestrator::{Orchestrator, PipelineDeps, RunOutcome, RunRequest};
