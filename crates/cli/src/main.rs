//! Vol Trainer — backtest-driven signal training for trade watchers
//!
//! Usage:
//!   vol-trainer train                  — optimize every watcher, persist winners
//!   vol-trainer model                  — build and write the prediction model
//!   vol-trainer latest --watcher-type trendline --watcher-config "15,1.03,0.9"

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use engine::{
    build_model, run_training, write_snapshot, FeeConfig, GridRanges, ModelConfig,
    SimulationRecord, TrainConfig, VolumeIndex, VolumeRecord, Watcher,
};
use persistence::repository::simulation::SimulationRow;
use persistence::repository::{SimulationRepository, TradeRepository, VolumeRepository};
use persistence::Database;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "vol-trainer")]
#[command(about = "Backtest-driven signal training for trade watchers", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize every watcher and persist the accepted configurations
    Train {
        /// Replay lookback window in days
        #[arg(long, default_value_t = 90)]
        days: i64,
        /// Maximum optimizations in flight
        #[arg(long, default_value_t = 3)]
        concurrency: usize,
        /// Neighbor radius sweep, inclusive
        #[arg(long, default_value_t = 10)]
        radius_min: u32,
        #[arg(long, default_value_t = 30)]
        radius_max: u32,
        /// History limit sweep, inclusive
        #[arg(long, default_value_t = 3)]
        history_min: usize,
        #[arg(long, default_value_t = 10)]
        history_max: usize,
        /// Win-rate threshold sweep, inclusive
        #[arg(long, default_value = "0.5")]
        win_rate_min: Decimal,
        #[arg(long, default_value = "0.9")]
        win_rate_max: Decimal,
        #[arg(long, default_value = "0.1")]
        win_rate_step: Decimal,
        /// Commission rate per fill
        #[arg(long, default_value = "0.0075")]
        fee_rate: Decimal,
        /// Notional per simulated trade
        #[arg(long, default_value = "100")]
        notional: Decimal,
    },
    /// Build the prediction model from recent accepted configurations
    Model {
        /// Output path for the model snapshot
        #[arg(long, default_value = "model.json")]
        output: String,
        /// Ignore accepted configurations older than this many hours
        #[arg(long, default_value_t = 3)]
        staleness_hours: i64,
    },
    /// Show the latest accepted configuration for one watcher
    Latest {
        #[arg(long)]
        watcher_type: String,
        #[arg(long)]
        watcher_config: String,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,vol_trainer=debug")
    } else {
        EnvFilter::new("info,engine=info,vol_trainer=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn trades_db_path() -> String {
    std::env::var("VOL_TRAINER_TRADES_DB").unwrap_or_else(|_| "data/trades.db".to_string())
}

fn volume_db_path() -> String {
    std::env::var("VOL_TRAINER_VOLUME_DB").unwrap_or_else(|_| "data/volume.db".to_string())
}

fn predictions_db_path() -> String {
    std::env::var("VOL_TRAINER_PREDICTIONS_DB").unwrap_or_else(|_| "data/predictions.db".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Train {
            days,
            concurrency,
            radius_min,
            radius_max,
            history_min,
            history_max,
            win_rate_min,
            win_rate_max,
            win_rate_step,
            fee_rate,
            notional,
        } => {
            let config = TrainConfig {
                ranges: GridRanges {
                    radius_min,
                    radius_max,
                    history_min,
                    history_max,
                    win_rate_min,
                    win_rate_max,
                    win_rate_step,
                },
                fees: FeeConfig {
                    fee_rate,
                    unit_notional: notional,
                },
                concurrency,
                lookback_days: days,
            };
            cmd_train(config).await?;
        }
        Commands::Model {
            output,
            staleness_hours,
        } => {
            cmd_model(&output, ModelConfig { staleness_hours }).await?;
        }
        Commands::Latest {
            watcher_type,
            watcher_config,
        } => {
            cmd_latest(&watcher_type, &watcher_config).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Train command
// ============================================================================

async fn cmd_train(config: TrainConfig) -> anyhow::Result<()> {
    info!("Vol Trainer v{} — training run starting", APP_VERSION);

    let trades_db = Database::new(trades_db_path()).await?;
    let volume_db = Database::new(volume_db_path()).await?;
    let predictions_db = Database::new(predictions_db_path()).await?;

    let index = Arc::new(load_volume_index(&volume_db).await?);
    info!(pairs = index.len(), "Volume index loaded");

    let watchers: Vec<Watcher> = TradeRepository::new(trades_db.pool())
        .distinct_watchers()
        .await?
        .into_iter()
        .map(|(kind, config)| Watcher::new(kind, config))
        .collect();
    info!(watchers = watchers.len(), "Distinct watchers loaded");

    let start = Utc::now() - Duration::days(config.lookback_days);
    let accepted =
        run_training(trades_db.pool_clone(), index, watchers, Arc::new(config), start).await;

    let rows: Vec<SimulationRow> = accepted.iter().map(SimulationRow::from).collect();
    let saved = SimulationRepository::new(predictions_db.pool())
        .save_batch(&rows)
        .await?;
    info!(saved, "Accepted configurations persisted");

    Ok(())
}

// ============================================================================
// Model command
// ============================================================================

async fn cmd_model(output: &str, config: ModelConfig) -> anyhow::Result<()> {
    info!("Vol Trainer v{} — model build starting", APP_VERSION);

    let trades_db = Database::new(trades_db_path()).await?;
    let volume_db = Database::new(volume_db_path()).await?;
    let predictions_db = Database::new(predictions_db_path()).await?;

    let index = load_volume_index(&volume_db).await?;

    let now = Utc::now();
    let cutoff = now - Duration::hours(config.staleness_hours);
    let records: Vec<SimulationRecord> = SimulationRepository::new(predictions_db.pool())
        .recent_since(cutoff)
        .await?
        .into_iter()
        .map(SimulationRecord::try_from)
        .collect::<Result<_, _>>()?;
    info!(records = records.len(), "Recent accepted configurations loaded");

    let snapshot = build_model(trades_db.pool(), &index, &records, now).await?;
    write_snapshot(output, &snapshot)?;

    Ok(())
}

// ============================================================================
// Latest command
// ============================================================================

async fn cmd_latest(watcher_type: &str, watcher_config: &str) -> anyhow::Result<()> {
    let predictions_db = Database::new(predictions_db_path()).await?;

    let latest = SimulationRepository::new(predictions_db.pool())
        .latest_for_watcher(watcher_type, watcher_config)
        .await?;

    match latest {
        Some(row) => {
            let record = SimulationRecord::try_from(row)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => {
            println!("No accepted configuration for {watcher_type} {watcher_config}");
        }
    }

    Ok(())
}

async fn load_volume_index(volume_db: &Database) -> anyhow::Result<VolumeIndex> {
    let records: Vec<VolumeRecord> = VolumeRepository::new(volume_db.pool())
        .all_by_volume()
        .await?
        .into_iter()
        .map(VolumeRecord::try_from)
        .collect::<Result<_, _>>()?;

    Ok(VolumeIndex::new(records))
}
