//! Error types for auction storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage failures. These are faults, not rule violations: the engine
/// reports the whole command as failed when one surfaces.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted snapshot: {0}")]
    Corrupted(#[from] serde_json::Error),
}
