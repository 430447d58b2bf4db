//! Explicit configuration threaded through the trainer
//!
//! Everything the engine tunes lives here; the binary fills these structs
//! from CLI arguments and environment variables. Defaults reproduce the
//! production constants.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The swept parameter space: radius, history size, win-rate threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridRanges {
    pub radius_min: u32,
    pub radius_max: u32,
    pub history_min: usize,
    pub history_max: usize,
    pub win_rate_min: Decimal,
    pub win_rate_max: Decimal,
    pub win_rate_step: Decimal,
}

impl GridRanges {
    /// Radii in sweep order (ascending)
    pub fn radii(&self) -> impl Iterator<Item = u32> {
        self.radius_min..=self.radius_max
    }

    /// History limits in sweep order (ascending)
    pub fn history_limits(&self) -> impl Iterator<Item = usize> {
        self.history_min..=self.history_max
    }

    /// Win-rate thresholds in sweep order: min, min+step, ... up to and
    /// including max. Decimal steps are exact, so 0.5..0.9 by 0.1 yields
    /// precisely five thresholds with no float drift.
    pub fn win_rate_limits(&self) -> Vec<Decimal> {
        let mut limits = Vec::new();
        let mut limit = self.win_rate_min;
        while limit <= self.win_rate_max {
            limits.push(limit);
            limit += self.win_rate_step;
        }
        limits
    }
}

impl Default for GridRanges {
    fn default() -> Self {
        Self {
            radius_min: 10,
            radius_max: 30,
            history_min: 3,
            history_max: 10,
            win_rate_min: dec!(0.5),
            win_rate_max: dec!(0.9),
            win_rate_step: dec!(0.1),
        }
    }
}

/// Round-trip commission model: a fixed notional per trade, charged on both
/// the entry and the exit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub fee_rate: Decimal,
    pub unit_notional: Decimal,
}

impl FeeConfig {
    /// Commission charged per simulated trade
    pub fn fee_per_trade(&self) -> Decimal {
        self.unit_notional * self.fee_rate * dec!(2)
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.0075),
            unit_notional: dec!(100),
        }
    }
}

/// Configuration for one training (optimization) run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub ranges: GridRanges,
    pub fees: FeeConfig,
    /// Maximum optimizations in flight at once
    pub concurrency: usize,
    /// Replay starts this many days before the run
    pub lookback_days: i64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            ranges: GridRanges::default(),
            fees: FeeConfig::default(),
            concurrency: 3,
            lookback_days: 90,
        }
    }
}

/// Configuration for a model-builder run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Accepted configurations older than this are ignored
    pub staleness_hours: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { staleness_hours: 3 }
    }
}
