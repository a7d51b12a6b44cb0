//! Local file-backed store: one JSON document per auction.

use std::fs;
use std::path::PathBuf;

use auction_core::{Auction, AuctionId};

use crate::error::Result;
use crate::store::AuctionStore;

/// Stores each auction as `<id>.json` under a data directory. Writes go
/// to a temp file first and are renamed into place, so a crashed save
/// never leaves a truncated snapshot behind.
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        tracing::info!(dir = %data_dir.display(), "local auction store initialized");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn path_for(&self, auction_id: &AuctionId) -> PathBuf {
        self.data_dir.join(format!("{auction_id}.json"))
    }
}

impl AuctionStore for LocalStore {
    fn load(&self, auction_id: &AuctionId) -> Result<Option<Auction>> {
        let path = self.path_for(auction_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, auction: &Auction) -> Result<()> {
        let path = self.path_for(&auction.id);
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(auction)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(auction = %auction.id, "saved snapshot");
        Ok(())
    }

    fn delete(&self, auction_id: &AuctionId) -> Result<()> {
        match fs::remove_file(self.path_for(auction_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn list_ids(&self) -> Result<Vec<AuctionId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = stem.parse::<AuctionId>() {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
