//! Trade ledger repository — read side of the closed-trade history
//!
//! The ledger is written by the live trading process; the trainer only ever
//! reads it. All queries are keyed by the watcher identity (type + config)
//! because history populations must never mix strategy instances.

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A single closed trade as stored in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRow {
    pub id: Option<i64>,
    pub pair: String,
    /// Epoch milliseconds of the buy decision
    pub bought_timestamp: i64,
    /// Realized PnL, stored as TEXT to preserve Decimal precision
    pub pnl: String,
    pub watcher_type: String,
    pub watcher_config: String,
}

/// Repository for the trade ledger
pub struct TradeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TradeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a trade (used by seeding tools and tests; the trainer never writes)
    pub async fn insert(&self, row: &TradeRow) -> DbResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO trades (pair, bought_timestamp, pnl, watcher_type, watcher_config)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(&row.pair)
        .bind(row.bought_timestamp)
        .bind(&row.pnl)
        .bind(&row.watcher_type)
        .bind(&row.watcher_config)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Distinct watcher identities observed in the ledger
    pub async fn distinct_watchers(&self) -> DbResult<Vec<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT DISTINCT watcher_type, watcher_config FROM trades
               ORDER BY watcher_type, watcher_config"#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Distinct pair symbols observed in the ledger
    pub async fn distinct_pairs(&self) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT pair FROM trades ORDER BY pair")
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    /// All trades for one watcher from `since_ms` on, ascending by timestamp.
    /// Chronological order is load-bearing: the replay must see trades in the
    /// order they were taken.
    pub async fn replay_since(
        &self,
        watcher_type: &str,
        watcher_config: &str,
        since_ms: i64,
    ) -> DbResult<Vec<TradeRow>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            r#"SELECT id, pair, bought_timestamp, pnl, watcher_type, watcher_config
               FROM trades
               WHERE watcher_type = ?1 AND watcher_config = ?2 AND bought_timestamp >= ?3
               ORDER BY bought_timestamp ASC"#,
        )
        .bind(watcher_type)
        .bind(watcher_config)
        .bind(since_ms)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// The most recent trades strictly before `before_ms` for one watcher,
    /// restricted to the given pairs, descending by timestamp, at most `limit`.
    pub async fn history_before(
        &self,
        watcher_type: &str,
        watcher_config: &str,
        pairs: &[String],
        before_ms: i64,
        limit: i64,
    ) -> DbResult<Vec<TradeRow>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; pairs.len()].join(", ");
        let sql = format!(
            r#"SELECT id, pair, bought_timestamp, pnl, watcher_type, watcher_config
               FROM trades
               WHERE watcher_type = ? AND watcher_config = ?
                 AND bought_timestamp < ?
                 AND pair IN ({placeholders})
               ORDER BY bought_timestamp DESC
               LIMIT ?"#
        );

        let mut query = sqlx::query_as::<_, TradeRow>(&sql)
            .bind(watcher_type)
            .bind(watcher_config)
            .bind(before_ms);
        for pair in pairs {
            query = query.bind(pair);
        }
        query = query.bind(limit);

        let rows = query.fetch_all(self.pool).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn trade(pair: &str, ts: i64, pnl: &str) -> TradeRow {
        TradeRow {
            id: None,
            pair: pair.to_string(),
            bought_timestamp: ts,
            pnl: pnl.to_string(),
            watcher_type: "trendline".to_string(),
            watcher_config: "15,1.03,0.9".to_string(),
        }
    }

    #[tokio::test]
    async fn test_history_before_is_strict_and_descending() {
        let db = Database::in_memory().await.unwrap();
        let repo = TradeRepository::new(db.pool());

        for (ts, pnl) in [(1000, "1"), (2000, "-1"), (3000, "2"), (4000, "3")] {
            repo.insert(&trade("BTCUSDT", ts, pnl)).await.unwrap();
        }

        let pairs = vec!["BTCUSDT".to_string()];
        let rows = repo
            .history_before("trendline", "15,1.03,0.9", &pairs, 3000, 10)
            .await
            .unwrap();

        // Strictly before 3000, newest first
        let stamps: Vec<i64> = rows.iter().map(|r| r.bought_timestamp).collect();
        assert_eq!(stamps, vec![2000, 1000]);
    }

    #[tokio::test]
    async fn test_history_before_respects_limit_and_pairs() {
        let db = Database::in_memory().await.unwrap();
        let repo = TradeRepository::new(db.pool());

        for ts in [1000, 2000, 3000] {
            repo.insert(&trade("BTCUSDT", ts, "1")).await.unwrap();
            repo.insert(&trade("ETHUSDT", ts + 10, "1")).await.unwrap();
        }

        let pairs = vec!["ETHUSDT".to_string()];
        let rows = repo
            .history_before("trendline", "15,1.03,0.9", &pairs, 10_000, 2)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.pair == "ETHUSDT"));
        assert_eq!(rows[0].bought_timestamp, 3010);
    }

    #[tokio::test]
    async fn test_history_before_empty_pairs_matches_nothing() {
        let db = Database::in_memory().await.unwrap();
        let repo = TradeRepository::new(db.pool());
        repo.insert(&trade("BTCUSDT", 1000, "1")).await.unwrap();

        let rows = repo
            .history_before("trendline", "15,1.03,0.9", &[], 10_000, 10)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_watchers_and_pairs() {
        let db = Database::in_memory().await.unwrap();
        let repo = TradeRepository::new(db.pool());

        repo.insert(&trade("BTCUSDT", 1000, "1")).await.unwrap();
        repo.insert(&trade("BTCUSDT", 2000, "1")).await.unwrap();
        let mut other = trade("ETHUSDT", 3000, "1");
        other.watcher_type = "volatility".to_string();
        repo.insert(&other).await.unwrap();

        let watchers = repo.distinct_watchers().await.unwrap();
        assert_eq!(watchers.len(), 2);

        let pairs = repo.distinct_pairs().await.unwrap();
        assert_eq!(pairs, vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
    }

    #[tokio::test]
    async fn test_replay_since_is_ascending_and_inclusive() {
        let db = Database::in_memory().await.unwrap();
        let repo = TradeRepository::new(db.pool());

        for ts in [3000, 1000, 2000] {
            repo.insert(&trade("BTCUSDT", ts, "1")).await.unwrap();
        }

        let rows = repo
            .replay_since("trendline", "15,1.03,0.9", 2000)
            .await
            .unwrap();
        let stamps: Vec<i64> = rows.iter().map(|r| r.bought_timestamp).collect();
        assert_eq!(stamps, vec![2000, 3000]);
    }
}
