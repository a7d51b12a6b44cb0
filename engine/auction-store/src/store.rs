//! Storage trait and the in-memory implementation.

use std::collections::HashMap;

use auction_core::{Auction, AuctionId};
use parking_lot::RwLock;

use crate::error::Result;

/// Abstract storage collaborator. The engine loads a snapshot before and
/// saves one after every mutating command; it assumes `save` either fully
/// succeeds or the command is reported as failed.
pub trait AuctionStore: Send + Sync {
    /// Fetch a snapshot by id, `None` when unknown.
    fn load(&self, auction_id: &AuctionId) -> Result<Option<Auction>>;

    /// Persist a snapshot, replacing any previous one for the same id.
    fn save(&self, auction: &Auction) -> Result<()>;

    /// Remove a snapshot. Unknown ids are a no-op.
    fn delete(&self, auction_id: &AuctionId) -> Result<()>;

    /// Ids of every stored auction.
    fn list_ids(&self) -> Result<Vec<AuctionId>>;
}

/// In-memory store (tests, demos). Snapshots are cloned on both sides of
/// the boundary so callers never alias stored state.
#[derive(Default)]
pub struct MemoryStore {
    auctions: RwLock<HashMap<AuctionId, Auction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuctionStore for MemoryStore {
    fn load(&self, auction_id: &AuctionId) -> Result<Option<Auction>> {
        Ok(self.auctions.read().get(auction_id).cloned())
    }

    fn save(&self, auction: &Auction) -> Result<()> {
        self.auctions.write().insert(auction.id, auction.clone());
        Ok(())
    }

    fn delete(&self, auction_id: &AuctionId) -> Result<()> {
        self.auctions.write().remove(auction_id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<AuctionId>> {
        let mut ids: Vec<_> = self.auctions.read().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
