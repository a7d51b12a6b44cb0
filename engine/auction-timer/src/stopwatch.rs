//! Elapsed-time handle for the whole-session display clock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::countdown::TickFn;
use crate::scheduler::Pollable;

pub type LapFn = Arc<dyn Fn(u64) + Send + Sync>;

struct StopwatchState {
    /// Clock reading at start. `Some` means counting.
    anchor_ms: Option<u64>,
    /// Elapsed reading frozen at stop.
    frozen_ms: u64,
    /// Fixed lap length; each expiry fires the lap callback once.
    lap_every_ms: Option<u64>,
    next_lap_deadline_ms: Option<u64>,
    laps: u64,
    last_tick_secs: Option<u64>,
}

/// Counts up from start. Used for display only - it never gates bid
/// legality. An optional lap interval marks round boundaries without
/// ever ending the session itself.
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    state: Mutex<StopwatchState>,
    on_tick: Option<TickFn>,
    on_lap: Option<LapFn>,
}

impl Stopwatch {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(StopwatchState {
                anchor_ms: None,
                frozen_ms: 0,
                lap_every_ms: None,
                next_lap_deadline_ms: None,
                laps: 0,
                last_tick_secs: None,
            }),
            on_tick: None,
            on_lap: None,
        }
    }

    /// Attach a per-second elapsed tick callback.
    pub fn with_on_tick(mut self, f: TickFn) -> Self {
        self.on_tick = Some(f);
        self
    }

    /// Fire at fixed lap boundaries, passing the completed lap count.
    pub fn with_lap(mut self, every: Duration, f: LapFn) -> Self {
        self.state.get_mut().lap_every_ms = Some(every.as_millis() as u64);
        self.on_lap = Some(f);
        self
    }

    pub fn start(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if state.anchor_ms.is_some() {
            return;
        }
        state.anchor_ms = Some(now);
        state.next_lap_deadline_ms = state.lap_every_ms.map(|every| now + every);
    }

    /// Freeze the elapsed reading. For an ended session the clock stays
    /// at `end - start`.
    pub fn stop(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if let Some(anchor) = state.anchor_ms.take() {
            state.frozen_ms += now.saturating_sub(anchor);
        }
        state.next_lap_deadline_ms = None;
    }

    pub fn elapsed(&self) -> Duration {
        let now = self.clock.now_ms();
        let state = self.state.lock();
        Duration::from_millis(Self::elapsed_ms_at(&state, now))
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().anchor_ms.is_some()
    }

    /// Completed laps so far.
    pub fn laps(&self) -> u64 {
        self.state.lock().laps
    }

    fn elapsed_ms_at(state: &StopwatchState, now_ms: u64) -> u64 {
        match state.anchor_ms {
            Some(anchor) => state.frozen_ms + now_ms.saturating_sub(anchor),
            None => state.frozen_ms,
        }
    }
}

impl Pollable for Stopwatch {
    fn poll(&self) {
        let now = self.clock.now_ms();
        let mut tick_secs = None;
        let mut lap_counts = Vec::new();
        {
            let mut state = self.state.lock();
            if state.anchor_ms.is_none() {
                return;
            }
            let secs = Self::elapsed_ms_at(&state, now) / 1000;
            if state.last_tick_secs != Some(secs) {
                state.last_tick_secs = Some(secs);
                tick_secs = Some(secs);
            }
            // A long suspension may cross several lap boundaries at once;
            // each fires individually so no round goes unannounced.
            while let (Some(deadline), Some(every)) =
                (state.next_lap_deadline_ms, state.lap_every_ms)
            {
                if now < deadline {
                    break;
                }
                state.laps += 1;
                state.next_lap_deadline_ms = Some(deadline + every);
                lap_counts.push(state.laps);
            }
        }
        if let Some(secs) = tick_secs {
            if let Some(tick) = &self.on_tick {
                tick(secs);
            }
        }
        if let Some(lap) = &self.on_lap {
            for count in lap_counts {
                lap(count);
            }
        }
    }
}
