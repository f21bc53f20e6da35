use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use leadscout_common::Lead;

use super::HistoryStore;

/// Process-local history, used by the CLI when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    // user_id -> leads, oldest first
    leads: Mutex<HashMap<String, Vec<Lead>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one user's past leads.
    pub fn with_leads(user_id: &str, leads: Vec<Lead>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.leads.lock() {
            map.insert(user_id.to_string(), leads);
        }
        store
    }

    pub fn count(&self, user_id: &str) -> usize {
        self.leads
            .lock()
            .map(|m| m.get(user_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn query(&self, user_id: &str, limit: usize) -> Result<Vec<Lead>> {
        let map = self.leads.lock().map_err(|_| anyhow!("history lock poisoned"))?;
        Ok(map
            .get(user_id)
            .map(|leads| leads.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn append(&self, user_id: &str, _run_id: &str, _query: &str, leads: &[Lead]) -> Result<()> {
        let mut map = self.leads.lock().map_err(|_| anyhow!("history lock poisoned"))?;
        map.entry(user_id.to_string())
            .or_default()
            .extend(leads.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_common::{Entity, Platform};

    fn lead(name: &str) -> Lead {
        Lead::new(Entity::new(name), Platform::Maps)
    }

    #[tokio::test]
    async fn query_returns_most_recent_first_and_caps() {
        let store = MemoryHistoryStore::new();
        store.append("u1", "r1", "gyms", &[lead("A"), lead("B")]).await.unwrap();
        store.append("u1", "r2", "gyms", &[lead("C")]).await.unwrap();

        let recent = store.query("u1", 2).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|l| l.company_name()).collect();
        assert_eq!(names, vec!["C", "B"]);
        assert!(store.query("u2", 10).await.unwrap().is_empty());
        assert_eq!(store.count("u1"), 3);
    }
}
