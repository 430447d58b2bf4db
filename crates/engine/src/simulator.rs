//! Parameter-grid simulator — chronological replay of one watcher's trades
//!
//! Replays every trade the watcher took since the start date, in the order
//! they were taken, and accumulates base vs. predicted PnL for every grid
//! point. Each trade triggers exactly one history fetch (at the grid's
//! maximum history limit); the whole grid is evaluated against that one
//! population.

use crate::config::GridRanges;
use crate::error::EngineResult;
use crate::history::evaluate_history_grid;
use crate::types::{SimulationUnitResult, Trade, Watcher};
use crate::volume::VolumeIndex;
use chrono::{DateTime, Utc};
use persistence::repository::TradeRepository;
use persistence::SqlitePool;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Accumulated results for every grid point, keyed
/// `history_limit → win_rate_limit`
pub type SimulationGrid = BTreeMap<usize, BTreeMap<Decimal, SimulationUnitResult>>;

/// Replay `watcher`'s trades from `since` on and accumulate the grid.
///
/// Grid points with no verdict for a trade (insufficient history) skip that
/// trade entirely — including the base accumulators. Base PnL can therefore
/// differ between history limits for the same watcher and radius; that is a
/// property of history availability, and downstream comparisons rely on it
/// being per-grid-point.
pub async fn simulate(
    pool: &SqlitePool,
    index: &VolumeIndex,
    watcher: &Watcher,
    radius: u32,
    since: DateTime<Utc>,
    ranges: &GridRanges,
) -> EngineResult<SimulationGrid> {
    let repo = TradeRepository::new(pool);

    let rows = repo
        .replay_since(&watcher.kind, &watcher.config, since.timestamp_millis())
        .await?;
    let trades = rows
        .into_iter()
        .map(Trade::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        watcher = %watcher.kind,
        config = %watcher.config,
        radius,
        trades = trades.len(),
        "Replaying trades"
    );

    let mut grid = SimulationGrid::new();

    for trade in &trades {
        let neighbors = index.neighbors(&trade.pair, radius);
        if neighbors.is_empty() {
            continue;
        }

        // One fetch per trade, shared by the whole grid. Strictly-before
        // filtering keeps the trade itself and anything later out of its own
        // history.
        let history_rows = repo
            .history_before(
                &watcher.kind,
                &watcher.config,
                &neighbors,
                trade.bought_timestamp.timestamp_millis(),
                ranges.history_max as i64,
            )
            .await?;
        let history = history_rows
            .into_iter()
            .map(Trade::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let verdicts = evaluate_history_grid(&history, ranges);

        for (history_limit, row) in verdicts {
            for (win_rate_limit, verdict) in row {
                let Some(take) = verdict else {
                    continue;
                };

                let unit = grid
                    .entry(history_limit)
                    .or_default()
                    .entry(win_rate_limit)
                    .or_default();

                unit.net_pnl_base += trade.pnl;
                unit.trade_count_base += 1;
                if take {
                    unit.net_pnl_with_prediction += trade.pnl;
                    unit.trade_count_with_prediction += 1;
                }
            }
        }
    }

    Ok(grid)
}
