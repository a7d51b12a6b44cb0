//! Event fanout to notification/transport collaborators.

use auction_core::AuctionEvent;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Fans engine events out to every subscriber. Subscribers that drop
/// their receiver are pruned on the next publish.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<Sender<AuctionEvent>>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> Receiver<AuctionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn publish(&self, event: AuctionEvent) {
        self.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }
}
