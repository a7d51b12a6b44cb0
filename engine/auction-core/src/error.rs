//! Error types for auction aggregate commands

use thiserror::Error;

use crate::events::RejectReason;
use crate::types::{BidderId, Price};

/// Errors returned by aggregate commands. Every variant is a distinct,
/// matchable kind; rejected commands never leave partial mutations behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("bidder {bidder_id} is not registered on this auction")]
    UnknownBidder { bidder_id: BidderId },

    #[error("bidder id {bidder_id} is already registered")]
    DuplicateBidderId { bidder_id: BidderId },

    #[error("bidder {bidder_id} has placed bids and cannot be removed")]
    BidderHasBids { bidder_id: BidderId },

    #[error("bidder roster can only change while the auction is in setup")]
    NotInSetup,

    #[error("auction is not accepting bids")]
    AuctionNotActive,

    #[error("auction is not in progress")]
    NotInProgress,

    #[error("invalid auction configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error("bidder holds the most recent bid and cannot outbid themselves")]
    ConsecutiveBid,

    #[error("bid is below the starting price of {starting_price}")]
    BelowStartingPrice { starting_price: Price },

    #[error("bid is below the minimum of {minimum}")]
    BelowMinimumIncrement { minimum: Price },

    #[error("bidder's time window has expired")]
    BidderTimeExpired,

    #[error("there are no bids to cancel")]
    NoBidsToCancel,
}

impl From<RejectReason> for CoreError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::UnknownBidder { bidder_id } => CoreError::UnknownBidder { bidder_id },
            RejectReason::AuctionNotActive => CoreError::AuctionNotActive,
            RejectReason::ConsecutiveBid => CoreError::ConsecutiveBid,
            RejectReason::BelowStartingPrice { starting_price } => {
                CoreError::BelowStartingPrice { starting_price }
            }
            RejectReason::BelowMinimumIncrement { minimum } => {
                CoreError::BelowMinimumIncrement { minimum }
            }
            RejectReason::BidderTimeExpired => CoreError::BidderTimeExpired,
        }
    }
}
