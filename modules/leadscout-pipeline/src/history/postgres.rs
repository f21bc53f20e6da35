use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use leadscout_common::Lead;

use super::HistoryStore;

/// History persisted in the `lead_runs` table, one row per run with the
/// accepted leads as a JSONB array.
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run history migrations")?;
        info!("History migrations applied");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn query(&self, user_id: &str, limit: usize) -> Result<Vec<Lead>> {
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            r#"
            SELECT leads
            FROM lead_runs
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut leads = Vec::new();
        for (value,) in rows {
            match serde_json::from_value::<Vec<Lead>>(value) {
                Ok(run_leads) => leads.extend(run_leads.into_iter().rev()),
                Err(e) => warn!(user_id, error = %e, "Skipping unreadable history row"),
            }
            if leads.len() >= limit {
                break;
            }
        }
        leads.truncate(limit);
        Ok(leads)
    }

    async fn append(&self, user_id: &str, run_id: &str, query: &str, leads: &[Lead]) -> Result<()> {
        let count = i32::try_from(leads.len()).unwrap_or(i32::MAX);
        sqlx::query(
            r#"
            INSERT INTO lead_runs (run_id, user_id, query, leads, lead_count)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(run_id)
        .bind(user_id)
        .bind(query)
        .bind(serde_json::to_value(leads)?)
        .bind(count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
