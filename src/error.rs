//! Errors raised outside the calculation engine.
//!
//! The calculators themselves are infallible; only loading and looking
//! up policy tables can fail.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid policy {id}: {reason}")]
    InvalidPolicy { id: String, reason: String },

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
