//! Per-auction runtime state: the two timer handles and the current
//! bidder selection. Exists only while the auction is in progress; the
//! aggregate itself stays in the store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use auction_core::{BidderId, Round};
use auction_timer::{Countdown, Stopwatch};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Snapshot of the bidder countdown, returned by `select_bidder` and
/// `timer_state` for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub selected_bidder: Option<BidderId>,
    pub remaining_secs: u64,
    pub running: bool,
}

/// The engine holds exactly one stopwatch (session clock) and one
/// countdown (bidder window) per active auction - explicit handles, no
/// shared timer registry.
pub(crate) struct Session {
    pub(crate) stopwatch: Arc<Stopwatch>,
    pub(crate) countdown: Arc<Countdown>,
    selected_bidder: Mutex<Option<BidderId>>,
    /// Runtime round counter, bumped by the round-boundary callback and
    /// stamped onto accepted bids.
    round: Arc<AtomicU32>,
    pub(crate) bid_duration: Duration,
}

impl Session {
    pub(crate) fn new(
        stopwatch: Arc<Stopwatch>,
        countdown: Arc<Countdown>,
        round: Arc<AtomicU32>,
        bid_duration: Duration,
    ) -> Self {
        Self { stopwatch, countdown, selected_bidder: Mutex::new(None), round, bid_duration }
    }

    pub(crate) fn selected(&self) -> Option<BidderId> {
        *self.selected_bidder.lock()
    }

    pub(crate) fn select(&self, bidder_id: BidderId) {
        *self.selected_bidder.lock() = Some(bidder_id);
    }

    pub(crate) fn round(&self) -> Round {
        self.round.load(Ordering::SeqCst)
    }

    /// Countdown reading used for the time-window rule. Only the
    /// currently selected bidder is gated by the countdown; anyone else
    /// gets the full window.
    pub(crate) fn bidder_time_left(&self, bidder_id: BidderId) -> u64 {
        match self.selected() {
            Some(selected) if selected == bidder_id => self.countdown.remaining_secs(),
            _ => self.bid_duration.as_secs(),
        }
    }

    pub(crate) fn timer_state(&self) -> TimerState {
        TimerState {
            selected_bidder: self.selected(),
            remaining_secs: self.countdown.remaining_secs(),
            running: self.countdown.is_running(),
        }
    }

    /// Disarm both handles. Dropping the session afterwards removes them
    /// from the scheduler.
    pub(crate) fn disarm(&self) {
        self.countdown.stop();
        self.stopwatch.stop();
    }
}
