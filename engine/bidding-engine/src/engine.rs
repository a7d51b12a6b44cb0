//! The bidding engine: public command API over one auction aggregate at
//! a time, combining the state machine with the timer subsystem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::Receiver;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};

use auction_core::{
    Auction, AuctionEvent, AuctionId, AuctionResult, AuctionSettings, Bid, Bidder, BidderId,
    CoreError, NewBidder, Price, TimerKind,
};
use auction_store::AuctionStore;
use auction_timer::{Clock, Countdown, Stopwatch, TickScheduler};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EventBus;
use crate::session::{Session, TimerState};

type CommandGuard = ArcMutexGuard<RawMutex, ()>;

/// Orchestrator for auction sessions.
///
/// Every command follows the same pipeline: serialize on the auction's
/// command lock, load the snapshot, mutate the aggregate, save, then
/// emit events. Rule checks happen before any field is written, so a
/// rejected command leaves both the snapshot and the store untouched.
///
/// The engine itself never persists beyond the injected store and never
/// depends on a transport; collaborators subscribe to [`AuctionEvent`]s.
pub struct BiddingEngine {
    store: Arc<dyn AuctionStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    scheduler: TickScheduler,
    sessions: RwLock<HashMap<AuctionId, Arc<Session>>>,
    command_locks: Mutex<HashMap<AuctionId, Arc<Mutex<()>>>>,
    bus: Arc<EventBus>,
}

impl BiddingEngine {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let scheduler = TickScheduler::new(config.tick_interval());
        scheduler.start()?;

        tracing::info!(
            tick_interval_ms = config.tick_interval_ms,
            default_bid_duration_secs = config.default_bid_duration_secs,
            "bidding engine started"
        );

        Ok(Self {
            store,
            clock,
            config,
            scheduler,
            sessions: RwLock::new(HashMap::new()),
            command_locks: Mutex::new(HashMap::new()),
            bus: Arc::new(EventBus::new()),
        })
    }

    /// Receive engine events (auction changes, accepted/rejected bids,
    /// timer ticks, round boundaries, results).
    pub fn subscribe(&self) -> Receiver<AuctionEvent> {
        self.bus.subscribe()
    }

    /// Create a new auction in `Setup`. Settings are validated at start,
    /// not here, so an operator can stage a session incrementally.
    pub fn create_auction(
        &self,
        title: impl Into<String>,
        settings: AuctionSettings,
    ) -> Result<Auction, EngineError> {
        let auction = Auction::new(uuid::Uuid::new_v4(), title, settings, Utc::now());
        self.store.save(&auction)?;
        self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
        Ok(auction)
    }

    pub fn get_auction(&self, auction_id: &AuctionId) -> Result<Auction, EngineError> {
        self.load(auction_id)
    }

    pub fn list_auctions(&self) -> Result<Vec<AuctionId>, EngineError> {
        Ok(self.store.list_ids()?)
    }

    pub fn register_bidder(
        &self,
        auction_id: &AuctionId,
        new: NewBidder,
    ) -> Result<Bidder, EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let mut auction = self.load(auction_id)?;

        let bidder = auction.register_bidder(new).map_err(EngineError::Rule)?;
        self.store.save(&auction)?;
        self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
        Ok(bidder)
    }

    pub fn remove_bidder(
        &self,
        auction_id: &AuctionId,
        bidder_id: BidderId,
    ) -> Result<(), EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let mut auction = self.load(auction_id)?;

        auction.remove_bidder(bidder_id).map_err(EngineError::Rule)?;
        self.store.save(&auction)?;
        self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
        Ok(())
    }

    /// `Setup -> InProgress`: snapshot the settings, arm the session
    /// clock (and round lap when configured) and the bidder countdown.
    pub fn start(&self, auction_id: &AuctionId) -> Result<Auction, EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let mut auction = self.load(auction_id)?;

        auction.start(Utc::now()).map_err(EngineError::Rule)?;
        self.store.save(&auction)?;

        self.ensure_session(&auction);
        self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
        Ok(auction)
    }

    /// Arm or reset the bidder countdown for a selection. Selecting the
    /// holder of the most recent bid forces the window to zero - they
    /// cannot bid again until the selection changes. No auction data is
    /// mutated.
    pub fn select_bidder(
        &self,
        auction_id: &AuctionId,
        bidder_id: BidderId,
    ) -> Result<TimerState, EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let auction = self.load(auction_id)?;

        if auction.bidder(bidder_id).is_none() {
            return Err(EngineError::Rule(CoreError::UnknownBidder { bidder_id }));
        }
        let session = self
            .ensure_session(&auction)
            .ok_or(EngineError::Rule(CoreError::AuctionNotActive))?;

        session.select(bidder_id);
        if auction.last_bidder_id == Some(bidder_id) {
            session.countdown.force_expire();
            self.bus.publish(AuctionEvent::TimerTick {
                auction_id: auction.id,
                kind: TimerKind::Bidder,
                seconds: 0,
            });
        } else {
            session.countdown.reset(Some(session.bid_duration), true);
        }

        tracing::debug!(auction = %auction.id, bidder_id, "bidder selected");
        Ok(session.timer_state())
    }

    /// Run the full rule chain and append the bid. On acceptance the
    /// bidder countdown is re-armed to the full window.
    pub fn place_bid(
        &self,
        auction_id: &AuctionId,
        bidder_id: BidderId,
        amount: Price,
    ) -> Result<(Auction, Bid), EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let mut auction = self.load(auction_id)?;
        let session = self.ensure_session(&auction);

        let time_left = session
            .as_ref()
            .map(|s| s.bidder_time_left(bidder_id))
            .unwrap_or(self.config.default_bid_duration_secs);
        let round = session.as_ref().map(|s| s.round()).unwrap_or(auction.current_round);

        match auction.apply_bid(bidder_id, amount, round, Utc::now(), time_left) {
            Ok(bid) => {
                self.store.save(&auction)?;
                if let Some(session) = session {
                    // The accepted bidder is now the last bidder; leave
                    // the fresh window paused unless someone else holds
                    // the selection.
                    let auto_start = session.selected().is_some_and(|sel| sel != bidder_id);
                    session.countdown.reset(Some(session.bid_duration), auto_start);
                }
                self.bus
                    .publish(AuctionEvent::BidAccepted { auction_id: auction.id, bid: bid.clone() });
                self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
                Ok((auction, bid))
            }
            Err(reason) => {
                tracing::debug!(auction = %auction.id, bidder_id, amount, ?reason, "bid rejected");
                self.bus.publish(AuctionEvent::BidRejected {
                    auction_id: auction.id,
                    bidder_id,
                    reason,
                });
                Err(EngineError::Rule(reason.into()))
            }
        }
    }

    /// Remove the most recent bid; price and bidder tracking are
    /// recomputed from the remaining log. The bidder countdown is left
    /// untouched.
    pub fn cancel_last_bid(&self, auction_id: &AuctionId) -> Result<Auction, EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let mut auction = self.load(auction_id)?;

        auction.cancel_last_bid().map_err(EngineError::Rule)?;
        self.store.save(&auction)?;
        self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
        Ok(auction)
    }

    /// `InProgress -> Ended`: freeze the aggregate, disarm both timers
    /// and publish the frozen result.
    pub fn end(&self, auction_id: &AuctionId) -> Result<(Auction, AuctionResult), EngineError> {
        let _guard = self.command_guard(auction_id)?;
        let mut auction = self.load(auction_id)?;

        let result = auction.end(Utc::now()).map_err(EngineError::Rule)?;
        self.store.save(&auction)?;

        if let Some(session) = self.sessions.write().remove(auction_id) {
            session.disarm();
        }

        self.bus.publish(AuctionEvent::AuctionChanged { auction_id: auction.id });
        self.bus.publish(AuctionEvent::AuctionEnded {
            auction_id: auction.id,
            result: result.clone(),
        });
        Ok((auction, result))
    }

    /// Current bidder-countdown reading for display, without touching it.
    pub fn timer_state(&self, auction_id: &AuctionId) -> Result<TimerState, EngineError> {
        let auction = self.load(auction_id)?;
        let session = self
            .ensure_session(&auction)
            .ok_or(EngineError::Rule(CoreError::AuctionNotActive))?;
        Ok(session.timer_state())
    }

    /// Re-anchor the bidder countdown to a remote authoritative deadline
    /// (milliseconds on this engine's clock), absorbing drift between
    /// replicas. A deadline already in the past completes the window
    /// immediately.
    pub fn sync_bidder_deadline(
        &self,
        auction_id: &AuctionId,
        authoritative_end_ms: u64,
    ) -> Result<TimerState, EngineError> {
        let auction = self.load(auction_id)?;
        let session = self
            .ensure_session(&auction)
            .ok_or(EngineError::Rule(CoreError::AuctionNotActive))?;
        session.countdown.sync_with_authority(authoritative_end_ms);
        Ok(session.timer_state())
    }

    fn load(&self, auction_id: &AuctionId) -> Result<Auction, EngineError> {
        self.store
            .load(auction_id)?
            .ok_or(EngineError::UnknownAuction { auction_id: *auction_id })
    }

    /// Serialize commands per auction id. A second command while one is
    /// in flight reports `Busy` instead of interleaving.
    fn command_guard(&self, auction_id: &AuctionId) -> Result<CommandGuard, EngineError> {
        let lock = self
            .command_locks
            .lock()
            .entry(*auction_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.try_lock_arc().ok_or(EngineError::Busy { auction_id: *auction_id })
    }

    /// Runtime session for an in-progress auction, built on demand so a
    /// restarted engine re-arms timers for auctions loaded mid-session.
    fn ensure_session(&self, auction: &Auction) -> Option<Arc<Session>> {
        if !auction.is_active() {
            return None;
        }
        if let Some(session) = self.sessions.read().get(&auction.id) {
            return Some(session.clone());
        }

        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(auction.id)
            .or_insert_with(|| Arc::new(self.build_session(auction)))
            .clone();
        Some(session)
    }

    fn build_session(&self, auction: &Auction) -> Session {
        let auction_id = auction.id;
        let bid_duration = if auction.settings.bid_duration_secs > 0 {
            Duration::from_secs(auction.settings.bid_duration_secs)
        } else {
            self.config.default_bid_duration()
        };
        let round = Arc::new(AtomicU32::new(auction.current_round));

        let mut stopwatch = Stopwatch::new(self.clock.clone()).with_on_tick({
            let bus = self.bus.clone();
            Arc::new(move |secs| {
                bus.publish(AuctionEvent::TimerTick {
                    auction_id,
                    kind: TimerKind::Auction,
                    seconds: secs,
                });
            })
        });
        if let Some(round_secs) = auction.settings.round_duration_secs {
            let bus = self.bus.clone();
            let round = round.clone();
            stopwatch = stopwatch.with_lap(
                Duration::from_secs(round_secs),
                Arc::new(move |_laps| {
                    let next = round.fetch_add(1, Ordering::SeqCst) + 1;
                    bus.publish(AuctionEvent::RoundBoundary { auction_id, round: next });
                }),
            );
        }
        let stopwatch = Arc::new(stopwatch);

        let countdown = Arc::new(
            Countdown::new(self.clock.clone(), bid_duration)
                .with_on_tick({
                    let bus = self.bus.clone();
                    Arc::new(move |secs| {
                        bus.publish(AuctionEvent::TimerTick {
                            auction_id,
                            kind: TimerKind::Bidder,
                            seconds: secs,
                        });
                    })
                })
                .with_on_complete(Arc::new(move || {
                    tracing::debug!(auction = %auction_id, "bidder window expired");
                })),
        );

        self.scheduler.register(stopwatch.clone());
        self.scheduler.register(countdown.clone());
        stopwatch.start();

        tracing::debug!(auction = %auction_id, "session armed");
        Session::new(stopwatch, countdown, round, bid_duration)
    }
}

impl Drop for BiddingEngine {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}
