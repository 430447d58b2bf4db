//! Training orchestrator — fan the optimizer out over all watchers
//!
//! At most `concurrency` optimizations run at once, admitted by a counting
//! semaphore. The overlap only buys anything on ledger I/O: tasks share one
//! runtime and suspend at store queries. One watcher failing never aborts the
//! batch; it just contributes no record.

use crate::config::TrainConfig;
use crate::optimizer::optimize_watcher;
use crate::types::{SimulationRecord, Watcher};
use crate::volume::VolumeIndex;
use chrono::{DateTime, Utc};
use persistence::SqlitePool;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Config suffix of a degenerate, parameterless strategy variant
const ZERO_PARAM_SUFFIX: &str = ",0,0";
/// Config suffix of the same strategy with default parameters
const DEFAULT_PARAM_SUFFIX: &str = ",1.03,0.9";

/// Optimize every watcher and collect the accepted configurations.
///
/// Task completion order is whatever the scheduler produces; results are
/// independent of it because nothing mutable is shared across watchers.
pub async fn run_training(
    pool: SqlitePool,
    index: Arc<VolumeIndex>,
    watchers: Vec<Watcher>,
    config: Arc<TrainConfig>,
    start: DateTime<Utc>,
) -> Vec<SimulationRecord> {
    info!(
        watchers = watchers.len(),
        concurrency = config.concurrency,
        "Starting training run"
    );

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut tasks = JoinSet::new();

    for watcher in watchers {
        let pool = pool.clone();
        let index = Arc::clone(&index);
        let config = Arc::clone(&config);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            // Never closed while tasks are alive
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = optimize_watcher(&pool, &index, &watcher, &config, start).await;
            (watcher, result)
        });
    }

    let mut accepted = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(Some(record)))) => accepted.push(record),
            Ok((_, Ok(None))) => {}
            Ok((watcher, Err(e))) => {
                warn!(
                    watcher = %watcher.kind,
                    config = %watcher.config,
                    error = %e,
                    "Watcher optimization failed"
                );
            }
            Err(e) => warn!(error = %e, "Watcher optimization task panicked"),
        }
    }

    let accepted = drop_superseded(accepted);
    info!(accepted = accepted.len(), "Training run complete");
    accepted
}

/// Drop zero-parameter records superseded by their default-parameter sibling.
///
/// A watcher config ending in `,0,0` is the degenerate variant of the same
/// strategy whose config ends in `,1.03,0.9`; when both were accepted, only
/// the parameterized one is kept. The suffixes are compared literally — the
/// config string's grammar is not otherwise interpreted.
pub fn drop_superseded(records: Vec<SimulationRecord>) -> Vec<SimulationRecord> {
    let keep: Vec<bool> = records
        .iter()
        .map(|record| {
            let Some(stem) = record.watcher.config.strip_suffix(ZERO_PARAM_SUFFIX) else {
                return true;
            };
            let sibling = format!("{stem}{DEFAULT_PARAM_SUFFIX}");
            !records.iter().any(|other| {
                other.watcher.kind == record.watcher.kind && other.watcher.config == sibling
            })
        })
        .collect();

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
