//! # bidding-engine
//!
//! Orchestrator for ascending-price auction sessions: an operator
//! registers bidders, starts the session, places bids on their behalf
//! under time pressure, and ends it to freeze the result.
//!
//! The engine combines the [`auction_core`] state machine with the
//! [`auction_timer`] subsystem behind a small command API. It is
//! storage- and transport-agnostic: snapshots go through an injected
//! [`AuctionStore`] and notification collaborators subscribe to
//! [`AuctionEvent`]s.

pub mod config;
pub mod engine;
pub mod error;
pub mod session;

mod events;


pub use config::EngineConfig;
pub use engine::BiddingEngine;
pub use error::EngineError;
pub use session::TimerState;

pub use auction_core::{
    Auction, AuctionEvent, AuctionId, AuctionResult, AuctionSettings, AuctionStatus, Bid, Bidder,
    BidderId, CoreError, NewBidder, Price, RejectReason, TimerKind,
};
/// Re-export commonly used collaborator types
pub use auction_store::{AuctionStore, LocalStore, MemoryStore, StoreError};
pub use auction_timer::{Clock, ManualClock, SystemClock};

/// Default bidder window when an auction's settings leave it unset.
pub const DEFAULT_BID_DURATION_SECS: u64 = 60;

/// Default tick scheduler cadence.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = auction_timer::DEFAULT_TICK_INTERVAL_MS;
