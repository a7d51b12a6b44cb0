//! Error types for engine commands

use auction_core::{AuctionId, CoreError};
use auction_store::StoreError;
use auction_timer::TimerError;
use thiserror::Error;

/// Failures reported by the public command API. Expected rule violations
/// arrive as [`EngineError::Rule`]; only genuinely unexpected conditions
/// (storage I/O, corrupted snapshots) surface as [`EngineError::Fault`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("auction {auction_id} not found")]
    UnknownAuction { auction_id: AuctionId },

    #[error("auction {auction_id} is already processing a command")]
    Busy { auction_id: AuctionId },

    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error("storage fault: {0}")]
    Fault(#[from] StoreError),

    #[error("timer fault: {0}")]
    Timer(#[from] TimerError),
}

impl EngineError {
    /// The rule violation behind this error, if it is one.
    pub fn rule(&self) -> Option<&CoreError> {
        match self {
            EngineError::Rule(core) => Some(core),
            _ => None,
        }
    }
}
