//! Vol Trainer engine — backtest, grid search, and model derivation
//!
//! Searches, per watcher, for a `(radius, historyLimit, winRateLimit)`
//! configuration whose history win-rate filter would have improved realized
//! PnL after fees, and derives a hashed prediction model from the winners.
//! Provides:
//! - Volume index with neighbor-pair lookup and family bucketing
//! - History win-rate evaluator and whole-grid evaluation
//! - Chronological grid simulator and per-watcher optimizer
//! - Semaphore-bounded training orchestrator with redundancy filtering
//! - Prediction model builder with content-hashed snapshots

pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod optimizer;
pub mod orchestrator;
pub mod simulator;
pub mod types;
pub mod volume;

// Re-exports for convenience
pub use config::{FeeConfig, GridRanges, ModelConfig, TrainConfig};
pub use error::{EngineError, EngineResult};
pub use history::{evaluate_history, evaluate_history_grid, VerdictGrid};
pub use model::{build_model, model_hash, write_snapshot};
pub use optimizer::{optimize_watcher, subtract_fees};
pub use orchestrator::{drop_superseded, run_training};
pub use simulator::{simulate, SimulationGrid};
pub use types::*;
pub use volume::{VolumeFamily, VolumeIndex, VOLUME_FAMILIES};
