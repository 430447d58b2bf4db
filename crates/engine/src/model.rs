//! Prediction model builder — turn accepted configurations into a signal map
//!
//! Replays every accepted configuration against every known pair "as of now":
//! a pair carries a take signal for a watcher when a synthetic trade opened at
//! this instant would pass the watcher's winning filter. The result is a
//! hashed snapshot that wholesale-replaces any previous model.

use crate::error::EngineResult;
use crate::history::evaluate_history;
use crate::types::{ModelSnapshot, PredictionModel, SimulationRecord, Trade};
use crate::volume::VolumeIndex;
use chrono::{DateTime, Utc};
use persistence::repository::TradeRepository;
use persistence::SqlitePool;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

/// Build the model snapshot from the accepted records within the staleness
/// window. `now` is the evaluation instant for every synthetic trade, passed
/// in explicitly so identical inputs produce an identical hash.
pub async fn build_model(
    pool: &SqlitePool,
    index: &VolumeIndex,
    records: &[SimulationRecord],
    now: DateTime<Utc>,
) -> EngineResult<ModelSnapshot> {
    let repo = TradeRepository::new(pool);
    let pairs = repo.distinct_pairs().await?;

    info!(
        pairs = pairs.len(),
        records = records.len(),
        "Building prediction model"
    );

    let mut model = PredictionModel::new();

    for pair in &pairs {
        for record in records {
            let neighbors = index.neighbors(pair, record.config.radius);
            if neighbors.is_empty() {
                continue;
            }

            // A synthetic trade opened right now: same history lookup a live
            // trade would get, fetched at the record's own history limit
            let history_rows = repo
                .history_before(
                    &record.watcher.kind,
                    &record.watcher.config,
                    &neighbors,
                    now.timestamp_millis(),
                    record.config.history_limit as i64,
                )
                .await?;
            let history = history_rows
                .into_iter()
                .map(Trade::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            let verdict = evaluate_history(
                &history,
                record.config.history_limit,
                record.config.win_rate_limit,
            );
            if verdict == Some(true) {
                model
                    .entry(pair.clone())
                    .or_default()
                    .entry(record.watcher.kind.clone())
                    .or_default()
                    .insert(record.watcher.config.clone(), true);
                debug!(
                    pair = %pair,
                    watcher = %record.watcher.kind,
                    config = %record.watcher.config,
                    "Take signal"
                );
            }
        }
    }

    let hash = model_hash(&model)?;
    info!(hash = %hash, pairs = model.len(), "Model built");

    Ok(ModelSnapshot {
        hash,
        watchers: records.iter().map(|r| r.watcher.clone()).collect(),
        model,
    })
}

/// Stable content hash over the serialized model mapping alone (the watcher
/// list is not part of the digest)
pub fn model_hash(model: &PredictionModel) -> EngineResult<String> {
    let bytes = serde_json::to_vec(model)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Serialize the snapshot and write it in one shot; nothing is written until
/// the snapshot is fully built, so a failed run leaves no partial file
pub fn write_snapshot(path: impl AsRef<Path>, snapshot: &ModelSnapshot) -> EngineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let bytes = serde_json::to_vec(snapshot)?;
    std::fs::write(path, bytes)?;

    info!(path = %path.display(), hash = %snapshot.hash, "Model snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SimulationConfig, VolumeRecord, Watcher};
    use chrono::TimeZone;
    use persistence::repository::trades::TradeRow;
    use persistence::Database;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn index(pairs: &[&str]) -> VolumeIndex {
        VolumeIndex::new(
            pairs
                .iter()
                .enumerate()
                .map(|(i, pair)| VolumeRecord {
                    pair: pair.to_string(),
                    vol_usdt: Decimal::from((i as i64 + 1) * 100),
                })
                .collect(),
        )
    }

    fn accepted(radius: u32, history_limit: usize, win_rate_limit: Decimal) -> SimulationRecord {
        SimulationRecord {
            watcher: Watcher::new("trendline", "15,1.03,0.9"),
            config: SimulationConfig {
                radius,
                history_limit,
                win_rate_limit,
            },
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
        }
    }

    async fn seed(db: &Database, pair: &str, pnls: &[&str]) {
        let repo = TradeRepository::new(db.pool());
        for (i, pnl) in pnls.iter().enumerate() {
            repo.insert(&TradeRow {
                id: None,
                pair: pair.to_string(),
                bought_timestamp: 1000 * (i as i64 + 1),
                pnl: pnl.to_string(),
                watcher_type: "trendline".to_string(),
                watcher_config: "15,1.03,0.9".to_string(),
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_winning_history_sets_take_signal() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, "BTCUSDT", &["1", "1", "-1", "1"]).await;

        let now = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let records = vec![accepted(0, 4, dec!(0.5))];
        let snapshot = build_model(db.pool(), &index(&["BTCUSDT"]), &records, now)
            .await
            .unwrap();

        // wins 3/4 = 0.75 > 0.5
        assert!(snapshot.model["BTCUSDT"]["trendline"]["15,1.03,0.9"]);
        assert_eq!(snapshot.watchers.len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_history_sets_no_signal() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, "BTCUSDT", &["1", "1", "-1", "1"]).await;

        let now = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let records = vec![accepted(0, 5, dec!(0.5))];
        let snapshot = build_model(db.pool(), &index(&["BTCUSDT"]), &records, now)
            .await
            .unwrap();

        assert!(snapshot.model.is_empty());
        // The watcher is still listed as considered
        assert_eq!(snapshot.watchers.len(), 1);
    }

    #[tokio::test]
    async fn test_pair_missing_from_volume_list_is_skipped() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, "BTCUSDT", &["1", "1"]).await;

        let now = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let records = vec![accepted(2, 1, dec!(0.5))];
        // Index does not know BTCUSDT: empty neighbor set, no evaluation
        let snapshot = build_model(db.pool(), &index(&["ETHUSDT"]), &records, now)
            .await
            .unwrap();

        assert!(snapshot.model.is_empty());
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_hash() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, "BTCUSDT", &["2", "3", "-1", "4"]).await;
        seed(&db, "ETHUSDT", &["1", "1"]).await;

        let now = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let records = vec![accepted(3, 2, dec!(0.5))];
        let idx = index(&["BTCUSDT", "ETHUSDT"]);

        let first = build_model(db.pool(), &idx, &records, now).await.unwrap();
        let second = build_model(db.pool(), &idx, &records, now).await.unwrap();

        assert_eq!(first.hash, second.hash);
        assert_eq!(first.model, second.model);
    }

    #[test]
    fn test_hash_covers_model_only() {
        let mut model = PredictionModel::new();
        model
            .entry("BTCUSDT".to_string())
            .or_default()
            .entry("trendline".to_string())
            .or_default()
            .insert("15,1.03,0.9".to_string(), true);

        let hash = model_hash(&model).unwrap();

        let with_watchers = ModelSnapshot {
            hash: hash.clone(),
            watchers: vec![Watcher::new("trendline", "15,1.03,0.9")],
            model: model.clone(),
        };
        let without_watchers = ModelSnapshot {
            hash: model_hash(&model).unwrap(),
            watchers: Vec::new(),
            model,
        };

        // Same mapping, same digest, regardless of the watcher list
        assert_eq!(with_watchers.hash, without_watchers.hash);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_empty_model_hash_is_stable() {
        let empty = PredictionModel::new();
        assert_eq!(model_hash(&empty).unwrap(), model_hash(&empty).unwrap());
    }
}
