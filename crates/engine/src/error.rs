//! Engine error taxonomy
//!
//! Store failures and malformed records are fatal to the unit of work that
//! hit them and propagate with `?`. "Insufficient history" and "empty
//! neighbor set" are NOT errors — they are ordinary outcomes expressed as
//! `None` verdicts and empty sequences and handled by skipping.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A fetched record failed shape validation (e.g. unparseable PnL)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model write error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] persistence::DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;
