//! Per-user store of leads already delivered.
//!
//! Queried at run start to seed the dedup guard, appended after each run.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use leadscout_common::Lead;

pub use memory::MemoryHistoryStore;
pub use postgres::PgHistoryStore;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The user's past leads, most recent first, at most `limit`.
    async fn query(&self, user_id: &str, limit: usize) -> Result<Vec<Lead>>;

    async fn append(&self, user_id: &str, run_id: &str, query: &str, leads: &[Lead]) -> Result<()>;
}
