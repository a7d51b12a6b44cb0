use core::fmt;

use serde::{Deserialize, Serialize};

pub type AuctionId = uuid::Uuid;
pub type BidderId = u32;
pub type BidId = u64;
pub type Price = u64;
pub type Round = u32;

/// Lifecycle status of an auction. Transitions are monotonic:
/// `Setup -> InProgress -> Ended`, never backward.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AuctionStatus {
    Setup = 0,
    InProgress = 1,
    Ended = 2,
}

impl AuctionStatus {
    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(self, next: AuctionStatus) -> bool {
        matches!(
            (self, next),
            (AuctionStatus::Setup, AuctionStatus::InProgress)
                | (AuctionStatus::InProgress, AuctionStatus::Ended)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == AuctionStatus::Ended
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionStatus::Setup => write!(f, "setup"),
            AuctionStatus::InProgress => write!(f, "in_progress"),
            AuctionStatus::Ended => write!(f, "ended"),
        }
    }
}
