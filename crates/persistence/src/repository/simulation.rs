//! Simulation-record repository — the prediction store
//!
//! Append-only: each training run inserts the configurations it accepted and
//! never updates old rows. Readers either take a recency window (the model
//! builder) or the single latest row per watcher (the live bot).

use crate::DbResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// An accepted simulation configuration as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SimulationRow {
    pub id: Option<i64>,
    pub watcher_type: String,
    pub watcher_config: String,
    pub radius: i64,
    pub history_limit: i64,
    /// Win-rate threshold, stored as TEXT to preserve Decimal precision
    pub win_rate_limit: String,
    /// Epoch milliseconds of derivation
    pub created_at: i64,
}

/// Repository for accepted simulation configurations
pub struct SimulationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SimulationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a batch of accepted configurations
    pub async fn save_batch(&self, rows: &[SimulationRow]) -> DbResult<usize> {
        let mut inserted = 0usize;
        for row in rows {
            sqlx::query(
                r#"INSERT INTO simulation_records
                     (watcher_type, watcher_config, radius, history_limit,
                      win_rate_limit, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )
            .bind(&row.watcher_type)
            .bind(&row.watcher_config)
            .bind(row.radius)
            .bind(row.history_limit)
            .bind(&row.win_rate_limit)
            .bind(row.created_at)
            .execute(self.pool)
            .await?;

            inserted += 1;
        }
        Ok(inserted)
    }

    /// All records created strictly after `cutoff` (the staleness window)
    pub async fn recent_since(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<SimulationRow>> {
        let rows = sqlx::query_as::<_, SimulationRow>(
            r#"SELECT id, watcher_type, watcher_config, radius, history_limit,
                      win_rate_limit, created_at
               FROM simulation_records
               WHERE created_at > ?1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(cutoff.timestamp_millis())
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// The most recent accepted configuration for one watcher, if any
    pub async fn latest_for_watcher(
        &self,
        watcher_type: &str,
        watcher_config: &str,
    ) -> DbResult<Option<SimulationRow>> {
        let row = sqlx::query_as::<_, SimulationRow>(
            r#"SELECT id, watcher_type, watcher_config, radius, history_limit,
                      win_rate_limit, created_at
               FROM simulation_records
               WHERE watcher_type = ?1 AND watcher_config = ?2
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(watcher_type)
        .bind(watcher_config)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::TimeZone;

    fn record(config: &str, created_at: i64) -> SimulationRow {
        SimulationRow {
            id: None,
            watcher_type: "trendline".to_string(),
            watcher_config: config.to_string(),
            radius: 15,
            history_limit: 5,
            win_rate_limit: "0.6".to_string(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_recent_since_filters_by_cutoff() {
        let db = Database::in_memory().await.unwrap();
        let repo = SimulationRepository::new(db.pool());

        repo.save_batch(&[record("a", 1000), record("b", 5000)])
            .await
            .unwrap();

        let cutoff = Utc.timestamp_millis_opt(2000).unwrap();
        let rows = repo.recent_since(cutoff).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].watcher_config, "b");
    }

    #[tokio::test]
    async fn test_latest_for_watcher_picks_newest() {
        let db = Database::in_memory().await.unwrap();
        let repo = SimulationRepository::new(db.pool());

        let mut old = record("15,1.03,0.9", 1000);
        old.radius = 10;
        let mut new = record("15,1.03,0.9", 9000);
        new.radius = 25;
        repo.save_batch(&[old, new]).await.unwrap();

        let latest = repo
            .latest_for_watcher("trendline", "15,1.03,0.9")
            .await
            .unwrap()
            .expect("record");
        assert_eq!(latest.radius, 25);

        let missing = repo
            .latest_for_watcher("trendline", "other")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
