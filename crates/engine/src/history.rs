//! History win-rate evaluator
//!
//! Decides, from a watcher's recent history on neighboring pairs, whether a
//! trade should have been taken. The caller supplies the population already
//! restricted (same watcher identity, neighbor pairs, strictly earlier
//! timestamps), ordered most-recent-first and fetched at the grid's maximum
//! history limit; evaluation itself is pure.

use crate::config::GridRanges;
use crate::types::Trade;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Verdicts for every grid point, keyed `history_limit → win_rate_limit`
pub type VerdictGrid = BTreeMap<usize, BTreeMap<Decimal, Option<bool>>>;

/// Evaluate one `(history_limit, win_rate_limit)` point.
///
/// Takes the `history_limit` most recent records of the population. Fewer
/// available means no verdict (`None`) — insufficient history is a hard gate
/// regardless of outcomes. Otherwise the verdict is whether the win ratio of
/// that truncated population strictly exceeds `win_rate_limit`.
pub fn evaluate_history(
    population: &[Trade],
    history_limit: usize,
    win_rate_limit: Decimal,
) -> Option<bool> {
    if history_limit == 0 || population.len() < history_limit {
        return None;
    }

    // Win count over the truncated population, not the full fetch
    let population = &population[..history_limit];
    let wins = population.iter().filter(|t| t.pnl > Decimal::ZERO).count();

    let win_rate = Decimal::from(wins) / Decimal::from(history_limit);
    Some(win_rate > win_rate_limit)
}

/// Evaluate the whole grid against one fetched population. The population is
/// fetched once at `ranges.history_max` and reused for every combination.
pub fn evaluate_history_grid(population: &[Trade], ranges: &GridRanges) -> VerdictGrid {
    let mut grid = VerdictGrid::new();
    for history_limit in ranges.history_limits() {
        let row = grid.entry(history_limit).or_default();
        for win_rate_limit in ranges.win_rate_limits() {
            row.insert(
                win_rate_limit,
                evaluate_history(population, history_limit, win_rate_limit),
            );
        }
    }
    grid
}
