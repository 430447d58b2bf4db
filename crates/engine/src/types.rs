//! Types for the training engine

use crate::error::EngineError;
use chrono::{DateTime, TimeZone, Utc};
use persistence::repository::simulation::SimulationRow;
use persistence::repository::trades::TradeRow;
use persistence::repository::volume::VolumeRow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of one strategy instance: strategy kind plus its serialized
/// parameter string. The parameter string is opaque to the engine except for
/// the redundancy filter's suffix check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Watcher {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: String,
}

impl Watcher {
    pub fn new(kind: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: config.into(),
        }
    }
}

/// A closed trade read from the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub pair: String,
    pub bought_timestamp: DateTime<Utc>,
    pub pnl: Decimal,
    pub watcher: Watcher,
}

impl TryFrom<TradeRow> for Trade {
    type Error = EngineError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let pnl = Decimal::from_str_exact(&row.pnl)
            .map_err(|e| EngineError::InvalidRecord(format!("trade pnl '{}': {e}", row.pnl)))?;
        let bought_timestamp = millis_to_datetime(row.bought_timestamp, "trade bought_timestamp")?;

        Ok(Self {
            pair: row.pair,
            bought_timestamp,
            pnl,
            watcher: Watcher {
                kind: row.watcher_type,
                config: row.watcher_config,
            },
        })
    }
}

/// One pair's traded volume in the reference currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub pair: String,
    pub vol_usdt: Decimal,
}

impl TryFrom<VolumeRow> for VolumeRecord {
    type Error = EngineError;

    fn try_from(row: VolumeRow) -> Result<Self, Self::Error> {
        let vol_usdt = Decimal::from_str_exact(&row.vol_usdt).map_err(|e| {
            EngineError::InvalidRecord(format!("volume '{}' for {}: {e}", row.vol_usdt, row.pair))
        })?;

        Ok(Self {
            pair: row.pair,
            vol_usdt,
        })
    }
}

/// PnL and trade-count accumulator for a single grid point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationUnitResult {
    pub net_pnl_base: Decimal,
    pub net_pnl_with_prediction: Decimal,
    pub trade_count_base: u32,
    pub trade_count_with_prediction: u32,
}

/// A winning parameter combination for one watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub radius: u32,
    pub history_limit: usize,
    pub win_rate_limit: Decimal,
}

/// An accepted configuration, as persisted to the prediction store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub watcher: Watcher,
    pub config: SimulationConfig,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SimulationRow> for SimulationRecord {
    type Error = EngineError;

    fn try_from(row: SimulationRow) -> Result<Self, Self::Error> {
        let win_rate_limit = Decimal::from_str_exact(&row.win_rate_limit).map_err(|e| {
            EngineError::InvalidRecord(format!("win_rate_limit '{}': {e}", row.win_rate_limit))
        })?;
        let radius = u32::try_from(row.radius)
            .map_err(|_| EngineError::InvalidRecord(format!("radius {}", row.radius)))?;
        let history_limit = usize::try_from(row.history_limit)
            .map_err(|_| EngineError::InvalidRecord(format!("history_limit {}", row.history_limit)))?;
        let created_at = millis_to_datetime(row.created_at, "record created_at")?;

        Ok(Self {
            watcher: Watcher {
                kind: row.watcher_type,
                config: row.watcher_config,
            },
            config: SimulationConfig {
                radius,
                history_limit,
                win_rate_limit,
            },
            created_at,
        })
    }
}

impl From<&SimulationRecord> for SimulationRow {
    fn from(record: &SimulationRecord) -> Self {
        Self {
            id: None,
            watcher_type: record.watcher.kind.clone(),
            watcher_config: record.watcher.config.clone(),
            radius: i64::from(record.config.radius),
            history_limit: record.config.history_limit as i64,
            win_rate_limit: record.config.win_rate_limit.to_string(),
            created_at: record.created_at.timestamp_millis(),
        }
    }
}

/// pair → watcher type → watcher config → "take" signal.
/// BTreeMaps keep serialization deterministic so the snapshot hash is stable.
pub type PredictionModel = BTreeMap<String, BTreeMap<String, BTreeMap<String, bool>>>;

/// The versioned model artifact written at the end of a model-builder run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub hash: String,
    pub watchers: Vec<Watcher>,
    pub model: PredictionModel,
}

fn millis_to_datetime(millis: i64, field: &str) -> Result<DateTime<Utc>, EngineError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| EngineError::InvalidRecord(format!("{field} {millis} out of range")))
}
