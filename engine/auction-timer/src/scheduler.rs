//! Single tick scheduler driving every timer handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::TimerError;

/// A timer handle the scheduler can drive. Implementations must return
/// quickly and only publish notifications from their callbacks.
pub trait Pollable: Send + Sync {
    fn poll(&self);
}

/// One background thread polling all registered handles at a fixed
/// cadence. Handles are held weakly: dropping the owning `Arc` disarms
/// the timer, so there is no shared registry to clean up.
pub struct TickScheduler {
    handles: Arc<Mutex<Vec<Weak<dyn Pollable>>>>,
    running: Arc<AtomicBool>,
    tick_interval: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TickScheduler {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            tick_interval,
            thread: Mutex::new(None),
        }
    }

    /// Start the tick loop.
    pub fn start(&self) -> Result<(), TimerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TimerError::SchedulerAlreadyRunning);
        }

        let handles = self.handles.clone();
        let running = self.running.clone();
        let tick_interval = self.tick_interval;

        let thread = thread::Builder::new()
            .name("tick-scheduler".into())
            .spawn(move || {
                tracing::debug!(interval_ms = tick_interval.as_millis() as u64, "tick loop started");
                while running.load(Ordering::Relaxed) {
                    let tick_start = Instant::now();

                    {
                        let mut handles = handles.lock();
                        handles.retain(|weak| match weak.upgrade() {
                            Some(handle) => {
                                handle.poll();
                                true
                            }
                            None => false,
                        });
                    }

                    Self::wait_for_next_tick(tick_start, tick_interval);
                }
                tracing::debug!("tick loop stopped");
            })
            .expect("spawn tick-scheduler thread");

        *self.thread.lock() = Some(thread);
        Ok(())
    }

    /// Register a handle to be driven on every tick.
    pub fn register(&self, handle: Arc<dyn Pollable>) {
        self.handles.lock().push(Arc::downgrade(&handle));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the tick loop and join the thread.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }

    fn wait_for_next_tick(tick_start: Instant, target: Duration) {
        let elapsed = tick_start.elapsed();
        if elapsed < target {
            thread::sleep(target - elapsed);
        }
        // Behind schedule: poll again immediately, the clock deltas make
        // the readings catch up on their own.
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
