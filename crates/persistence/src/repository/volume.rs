//! Volume reference repository — the pair universe ordered by traded volume

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// One pair's reference volume
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VolumeRow {
    pub pair: String,
    /// Traded volume in USDT, stored as TEXT to preserve Decimal precision
    pub vol_usdt: String,
}

/// Repository for the volume reference list
pub struct VolumeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VolumeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a pair's volume (used by the refresh job and tests)
    pub async fn upsert(&self, row: &VolumeRow) -> DbResult<()> {
        sqlx::query(
            r#"INSERT INTO volume_reference (pair, vol_usdt) VALUES (?1, ?2)
               ON CONFLICT(pair) DO UPDATE SET vol_usdt = excluded.vol_usdt"#,
        )
        .bind(&row.pair)
        .bind(&row.vol_usdt)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// All pairs ascending by volume — the materialized volume order
    pub async fn all_by_volume(&self) -> DbResult<Vec<VolumeRow>> {
        let rows = sqlx::query_as::<_, VolumeRow>(
            r#"SELECT pair, vol_usdt FROM volume_reference
               ORDER BY CAST(vol_usdt AS REAL) ASC"#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
