//! Database schema definitions

/// SQL to create all tables
/// NOTE: PnL, volumes and win-rate limits stored as TEXT to preserve
/// rust_decimal::Decimal precision; timestamps stored as epoch milliseconds
pub const CREATE_TABLES: &str = r#"
-- Trade ledger (read-only for the trainer, written by the live bot)
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pair TEXT NOT NULL,
    bought_timestamp INTEGER NOT NULL,
    pnl TEXT NOT NULL,
    watcher_type TEXT NOT NULL,
    watcher_config TEXT NOT NULL
);

-- Volume reference list, one row per pair
CREATE TABLE IF NOT EXISTS volume_reference (
    pair TEXT PRIMARY KEY,
    vol_usdt TEXT NOT NULL
);

-- Accepted simulation configurations (prediction store, append-only)
CREATE TABLE IF NOT EXISTS simulation_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    watcher_type TEXT NOT NULL,
    watcher_config TEXT NOT NULL,
    radius INTEGER NOT NULL,
    history_limit INTEGER NOT NULL,
    win_rate_limit TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- ========== INDEXES ==========

-- History queries filter by watcher identity and timestamp
CREATE INDEX IF NOT EXISTS idx_trades_watcher_time
    ON trades(watcher_type, watcher_config, bought_timestamp);
CREATE INDEX IF NOT EXISTS idx_trades_pair ON trades(pair);

CREATE INDEX IF NOT EXISTS idx_simulation_watcher
    ON simulation_records(watcher_type, watcher_config, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_simulation_created
    ON simulation_records(created_at)
"#;
