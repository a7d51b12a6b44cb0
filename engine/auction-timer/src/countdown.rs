//! Per-selection countdown handle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::error::TimerError;
use crate::scheduler::Pollable;

pub type TickFn = Arc<dyn Fn(u64) + Send + Sync>;
pub type CompleteFn = Arc<dyn Fn() + Send + Sync>;

struct CountdownState {
    duration_ms: u64,
    /// Remaining time as of `anchor_ms` (while running) or the frozen
    /// reading (while stopped).
    remaining_ms: u64,
    /// Clock reading at the most recent start. `Some` means running.
    anchor_ms: Option<u64>,
    /// Completion fired for the current arming; re-arm via `reset`/`sync`.
    completed: bool,
    last_tick_secs: Option<u64>,
}

/// Countdown owned by the caller as an explicit handle - there is no
/// shared timer registry. Remaining time is always re-derived from clock
/// deltas, never decremented per callback.
///
/// Callbacks only publish notifications; they must not call back into
/// engine commands.
pub struct Countdown {
    clock: Arc<dyn Clock>,
    state: Mutex<CountdownState>,
    on_tick: Option<TickFn>,
    on_complete: Option<CompleteFn>,
}

impl Countdown {
    pub fn new(clock: Arc<dyn Clock>, duration: Duration) -> Self {
        let duration_ms = duration.as_millis() as u64;
        Self {
            clock,
            state: Mutex::new(CountdownState {
                duration_ms,
                remaining_ms: duration_ms,
                anchor_ms: None,
                completed: false,
                last_tick_secs: None,
            }),
            on_tick: None,
            on_complete: None,
        }
    }

    /// Attach a per-second tick callback. Builder-style, call before
    /// sharing the handle.
    pub fn with_on_tick(mut self, f: TickFn) -> Self {
        self.on_tick = Some(f);
        self
    }

    /// Attach a completion callback, fired exactly once per arming.
    pub fn with_on_complete(mut self, f: CompleteFn) -> Self {
        self.on_complete = Some(f);
        self
    }

    pub fn start(&self) -> Result<(), TimerError> {
        let mut state = self.state.lock();
        if state.anchor_ms.is_some() {
            return Err(TimerError::AlreadyRunning);
        }
        if state.remaining_ms == 0 {
            return Err(TimerError::Expired);
        }
        state.anchor_ms = Some(self.clock.now_ms());
        Ok(())
    }

    /// Freeze the countdown, folding elapsed time into the remaining
    /// reading.
    pub fn pause(&self) -> Result<(), TimerError> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let anchor = state.anchor_ms.take().ok_or(TimerError::NotRunning)?;
        state.remaining_ms = state.remaining_ms.saturating_sub(now.saturating_sub(anchor));
        Ok(())
    }

    /// Re-arm to full value, optionally with a new duration, optionally
    /// starting immediately. Notifies the tick callback with the fresh
    /// reading.
    pub fn reset(&self, new_duration: Option<Duration>, auto_start: bool) {
        let now = self.clock.now_ms();
        let full_secs;
        {
            let mut state = self.state.lock();
            if let Some(d) = new_duration {
                state.duration_ms = d.as_millis() as u64;
            }
            state.remaining_ms = state.duration_ms;
            state.anchor_ms = if auto_start { Some(now) } else { None };
            state.completed = false;
            state.last_tick_secs = Some(state.duration_ms / 1000);
            full_secs = state.duration_ms / 1000;
        }
        if let Some(tick) = &self.on_tick {
            tick(full_secs);
        }
    }

    /// Disarm and discard. No callbacks fire.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.anchor_ms = None;
        state.remaining_ms = 0;
        state.completed = true;
    }

    /// Drive the reading straight to zero without firing completion.
    /// Used when the holder of the last bid is re-selected: they cannot
    /// bid again until the selection changes.
    pub fn force_expire(&self) {
        let mut state = self.state.lock();
        state.anchor_ms = None;
        state.remaining_ms = 0;
        state.completed = true;
        state.last_tick_secs = Some(0);
    }

    /// Re-anchor the countdown to a remote authoritative deadline,
    /// absorbing clock drift or network latency. When the deadline has
    /// already passed, completion fires immediately.
    pub fn sync_with_authority(&self, authoritative_end_ms: u64) {
        let now = self.clock.now_ms();
        let mut fire_complete = false;
        let secs;
        {
            let mut state = self.state.lock();
            let remaining = authoritative_end_ms.saturating_sub(now);
            state.duration_ms = remaining;
            state.remaining_ms = remaining;
            secs = remaining / 1000;
            state.last_tick_secs = Some(secs);
            if remaining > 0 {
                state.anchor_ms = Some(now);
                state.completed = false;
            } else {
                state.anchor_ms = None;
                if !state.completed {
                    state.completed = true;
                    fire_complete = true;
                }
            }
        }
        if let Some(tick) = &self.on_tick {
            tick(secs);
        }
        if fire_complete {
            if let Some(complete) = &self.on_complete {
                complete();
            }
        }
    }

    /// Current reading, derived from the clock when running.
    pub fn remaining(&self) -> Duration {
        let now = self.clock.now_ms();
        let state = self.state.lock();
        Duration::from_millis(Self::remaining_ms_at(&state, now))
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining().as_secs()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().anchor_ms.is_some()
    }

    fn remaining_ms_at(state: &CountdownState, now_ms: u64) -> u64 {
        match state.anchor_ms {
            Some(anchor) => state.remaining_ms.saturating_sub(now_ms.saturating_sub(anchor)),
            None => state.remaining_ms,
        }
    }
}

impl Pollable for Countdown {
    /// Called by the tick scheduler. Fires the tick callback when the
    /// whole-second reading changes and completion exactly once at zero.
    fn poll(&self) {
        let now = self.clock.now_ms();
        let mut tick_secs = None;
        let mut fire_complete = false;
        {
            let mut state = self.state.lock();
            if state.anchor_ms.is_none() {
                return;
            }
            let remaining = Self::remaining_ms_at(&state, now);
            let secs = remaining / 1000;
            if state.last_tick_secs != Some(secs) {
                state.last_tick_secs = Some(secs);
                tick_secs = Some(secs);
            }
            if remaining == 0 {
                state.anchor_ms = None;
                state.remaining_ms = 0;
                if !state.completed {
                    state.completed = true;
                    fire_complete = true;
                }
            }
        }
        // Callbacks run outside the lock; they only publish notifications.
        if let Some(secs) = tick_secs {
            if let Some(tick) = &self.on_tick {
                tick(secs);
            }
        }
        if fire_complete {
            if let Some(complete) = &self.on_complete {
                complete();
            }
        }
    }
}
