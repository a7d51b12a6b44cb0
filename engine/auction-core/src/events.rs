//! Events emitted by the bidding engine to its subscribers (UI stores,
//! transports, exporters). The engine never depends on a specific
//! transport; collaborators receive these and push them onward.

use serde::{Deserialize, Serialize};

use crate::auction::{AuctionResult, Bid};
use crate::types::{AuctionId, BidderId, Price, Round};

/// Rejection reasons for a proposed bid - explicit, enumerable, never a
/// raw string. Carried inside `AuctionEvent::BidRejected` and convertible
/// into [`CoreError`](crate::CoreError).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    UnknownBidder { bidder_id: BidderId },
    AuctionNotActive,
    ConsecutiveBid,
    BelowStartingPrice { starting_price: Price },
    BelowMinimumIncrement { minimum: Price },
    BidderTimeExpired,
}

/// Which timer a tick notification belongs to.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Whole-session clock. Ticks carry elapsed seconds since start.
    Auction = 0,
    /// Per-selection countdown. Ticks carry remaining seconds.
    Bidder = 1,
}

/// Canonical event types emitted by the engine.
#[derive(Debug, Clone)]
pub enum AuctionEvent {
    /// The aggregate snapshot changed (roster edit, start, bid, cancel, end).
    AuctionChanged { auction_id: AuctionId },
    /// A bid passed the full rule chain and was appended to the log.
    BidAccepted { auction_id: AuctionId, bid: Bid },
    /// A bid failed one of the validation rules. No state was mutated.
    BidRejected { auction_id: AuctionId, bidder_id: BidderId, reason: RejectReason },
    /// Periodic timer reading. Elapsed seconds for the auction clock,
    /// remaining seconds for the bidder countdown.
    TimerTick { auction_id: AuctionId, kind: TimerKind, seconds: u64 },
    /// The configured round duration elapsed. Notification only - ending
    /// the auction stays an explicit command.
    RoundBoundary { auction_id: AuctionId, round: Round },
    /// The auction transitioned to `Ended` and the result is frozen.
    AuctionEnded { auction_id: AuctionId, result: AuctionResult },
}

impl AuctionEvent {
    /// Get the auction id for routing.
    #[inline]
    pub fn auction_id(&self) -> AuctionId {
        match self {
            AuctionEvent::AuctionChanged { auction_id }
            | AuctionEvent::BidAccepted { auction_id, .. }
            | AuctionEvent::BidRejected { auction_id, .. }
            | AuctionEvent::TimerTick { auction_id, .. }
            | AuctionEvent::RoundBoundary { auction_id, .. }
            | AuctionEvent::AuctionEnded { auction_id, .. } => *auction_id,
        }
    }
}
