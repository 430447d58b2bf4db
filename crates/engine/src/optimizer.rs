//! Per-watcher optimizer — radius sweep, fee adjustment, selection
//!
//! Runs the grid simulator for every radius, charges round-trip commission
//! per simulated trade, and keeps the single best configuration that beats
//! the take-everything baseline after fees.

use crate::config::TrainConfig;
use crate::error::EngineResult;
use crate::simulator::simulate;
use crate::types::{SimulationConfig, SimulationRecord, SimulationUnitResult, Watcher};
use crate::volume::VolumeIndex;
use chrono::{DateTime, Utc};
use persistence::SqlitePool;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Charge the fixed per-trade commission against both buckets, proportionally
/// to their trade counts
pub fn subtract_fees(result: &SimulationUnitResult, fee_per_trade: Decimal) -> SimulationUnitResult {
    SimulationUnitResult {
        net_pnl_base: result.net_pnl_base - Decimal::from(result.trade_count_base) * fee_per_trade,
        net_pnl_with_prediction: result.net_pnl_with_prediction
            - Decimal::from(result.trade_count_with_prediction) * fee_per_trade,
        trade_count_base: result.trade_count_base,
        trade_count_with_prediction: result.trade_count_with_prediction,
    }
}

/// A fee-adjusted grid point qualifies only if the filtered PnL is
/// non-negative and at least as good as taking every trade
fn passes_acceptance(result: &SimulationUnitResult) -> bool {
    !(result.net_pnl_with_prediction < Decimal::ZERO
        || result.net_pnl_base > result.net_pnl_with_prediction)
}

/// Find the best `(radius, history_limit, win_rate_limit)` combination for
/// one watcher, or `None` if no combination is profitable after fees.
///
/// Candidates are visited ascending by radius, then history limit, then
/// win-rate limit; only a strictly greater predicted PnL displaces the
/// incumbent, so ties keep the first combination found.
pub async fn optimize_watcher(
    pool: &SqlitePool,
    index: &VolumeIndex,
    watcher: &Watcher,
    config: &TrainConfig,
    start: DateTime<Utc>,
) -> EngineResult<Option<SimulationRecord>> {
    let fee_per_trade = config.fees.fee_per_trade();
    let mut best: Option<(SimulationConfig, SimulationUnitResult)> = None;

    for radius in config.ranges.radii() {
        let grid = simulate(pool, index, watcher, radius, start, &config.ranges).await?;

        for history_limit in config.ranges.history_limits() {
            let Some(row) = grid.get(&history_limit) else {
                continue;
            };
            for win_rate_limit in config.ranges.win_rate_limits() {
                let Some(raw) = row.get(&win_rate_limit) else {
                    continue;
                };

                let result = subtract_fees(raw, fee_per_trade);
                if !passes_acceptance(&result) {
                    continue;
                }

                let incumbent = best
                    .as_ref()
                    .map(|(_, r)| r.net_pnl_with_prediction)
                    .unwrap_or(Decimal::ZERO);
                if result.net_pnl_with_prediction > incumbent {
                    best = Some((
                        SimulationConfig {
                            radius,
                            history_limit,
                            win_rate_limit,
                        },
                        result,
                    ));
                }
            }
        }
    }

    // The incumbent starts at zero, so a surviving best is already > 0
    match best {
        Some((config, result)) => {
            info!(
                watcher = %watcher.kind,
                config = %watcher.config,
                radius = config.radius,
                history_limit = config.history_limit,
                win_rate_limit = %config.win_rate_limit,
                net_pnl = %result.net_pnl_with_prediction,
                trades = result.trade_count_with_prediction,
                "Accepted configuration"
            );
            Ok(Some(SimulationRecord {
                watcher: watcher.clone(),
                config,
                created_at: Utc::now(),
            }))
        }
        None => {
            debug!(
                watcher = %watcher.kind,
                config = %watcher.config,
                "No profitable configuration"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeeConfig, GridRanges};
    use crate::types::VolumeRecord;
    use chrono::TimeZone;
    use persistence::repository::trades::TradeRow;
    use persistence::repository::TradeRepository;
    use persistence::Database;
    use rust_decimal_macros::dec;

    fn unit(base: Decimal, predicted: Decimal, base_n: u32, predicted_n: u32) -> SimulationUnitResult {
        SimulationUnitResult {
            net_pnl_base: base,
            net_pnl_with_prediction: predicted,
            trade_count_base: base_n,
            trade_count_with_prediction: predicted_n,
        }
    }

    #[test]
    fn test_fees_scale_with_trade_count() {
        let a = subtract_fees(&unit(dec!(100), dec!(50), 10, 5), dec!(1.5));
        let b = subtract_fees(&unit(dec!(100), dec!(50), 11, 5), dec!(1.5));

        assert_eq!(a.net_pnl_base, dec!(85));
        assert_eq!(a.net_pnl_with_prediction, dec!(42.5));
        // One more base trade costs exactly one more fee
        assert_eq!(a.net_pnl_base - b.net_pnl_base, dec!(1.5));
        assert_eq!(a.net_pnl_with_prediction, b.net_pnl_with_prediction);
    }

    #[test]
    fn test_fees_leave_counts_untouched() {
        let adjusted = subtract_fees(&unit(dec!(10), dec!(10), 4, 4), dec!(1.5));
        assert_eq!(adjusted.trade_count_base, 4);
        assert_eq!(adjusted.trade_count_with_prediction, 4);
    }

    #[test]
    fn test_acceptance_rejects_unprofitable_prediction() {
        assert!(!passes_acceptance(&unit(dec!(-10), dec!(-1), 5, 2)));
    }

    #[test]
    fn test_acceptance_rejects_prediction_worse_than_base() {
        assert!(!passes_acceptance(&unit(dec!(20), dec!(10), 5, 3)));
    }

    #[test]
    fn test_acceptance_allows_equal_or_better() {
        assert!(passes_acceptance(&unit(dec!(10), dec!(10), 5, 5)));
        assert!(passes_acceptance(&unit(dec!(-5), dec!(3), 5, 2)));
        assert!(passes_acceptance(&unit(dec!(0), dec!(0), 0, 0)));
    }

    async fn seed_winning_history(db: &Database) {
        let repo = TradeRepository::new(db.pool());
        // A run of profitable trades: each one's single-record history is a
        // win, so the filter takes everything and keeps the full PnL
        for (i, pnl) in ["5", "10", "20", "40"].iter().enumerate() {
            repo.insert(&TradeRow {
                id: None,
                pair: "BTCUSDT".to_string(),
                bought_timestamp: 1000 * (i as i64 + 1),
                pnl: pnl.to_string(),
                watcher_type: "trendline".to_string(),
                watcher_config: "15,1.03,0.9".to_string(),
            })
            .await
            .unwrap();
        }
    }

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            ranges: GridRanges {
                radius_min: 0,
                radius_max: 1,
                history_min: 1,
                history_max: 1,
                win_rate_min: dec!(0.5),
                win_rate_max: dec!(0.5),
                win_rate_step: dec!(0.1),
            },
            fees: FeeConfig::default(),
            concurrency: 3,
            lookback_days: 90,
        }
    }

    #[tokio::test]
    async fn test_optimize_accepts_profitable_watcher() {
        let db = Database::in_memory().await.unwrap();
        seed_winning_history(&db).await;

        let index = VolumeIndex::new(vec![VolumeRecord {
            pair: "BTCUSDT".to_string(),
            vol_usdt: dec!(1000000),
        }]);
        let watcher = Watcher::new("trendline", "15,1.03,0.9");
        let start = Utc.timestamp_millis_opt(0).unwrap();

        let record = optimize_watcher(db.pool(), &index, &watcher, &tiny_config(), start)
            .await
            .unwrap()
            .expect("profitable configuration");

        // Ties across radii keep the first (smallest) radius
        assert_eq!(record.config.radius, 0);
        assert_eq!(record.config.history_limit, 1);
        assert_eq!(record.config.win_rate_limit, dec!(0.5));
        assert_eq!(record.watcher, watcher);
    }

    #[tokio::test]
    async fn test_optimize_rejects_losing_watcher() {
        let db = Database::in_memory().await.unwrap();
        let repo = TradeRepository::new(db.pool());
        // Wins small, loses big: the predicted bucket ends negative
        for (ts, pnl) in [(1000, "0.1"), (2000, "-50"), (3000, "-60")] {
            repo.insert(&TradeRow {
                id: None,
                pair: "BTCUSDT".to_string(),
                bought_timestamp: ts,
                pnl: pnl.to_string(),
                watcher_type: "trendline".to_string(),
                watcher_config: "15,1.03,0.9".to_string(),
            })
            .await
            .unwrap();
        }

        let index = VolumeIndex::new(vec![VolumeRecord {
            pair: "BTCUSDT".to_string(),
            vol_usdt: dec!(1000000),
        }]);
        let watcher = Watcher::new("trendline", "15,1.03,0.9");
        let start = Utc.timestamp_millis_opt(0).unwrap();

        let record = optimize_watcher(db.pool(), &index, &watcher, &tiny_config(), start)
            .await
            .unwrap();
        assert!(record.is_none());
    }
}
