//! Configuration for the bidding engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{DEFAULT_BID_DURATION_SECS, DEFAULT_TICK_INTERVAL_MS};

/// Engine-level configuration. Per-auction pricing and timing live in
/// [`auction_core::AuctionSettings`]; this covers the process-wide knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cadence of the tick scheduler in milliseconds.
    pub tick_interval_ms: u64,

    /// Bidder window applied when an auction's settings leave it unset.
    pub default_bid_duration_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            default_bid_duration_secs: DEFAULT_BID_DURATION_SECS,
        }
    }
}

impl EngineConfig {
    /// Get the scheduler cadence as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Get the default bidder window as a Duration
    pub fn default_bid_duration(&self) -> Duration {
        Duration::from_secs(self.default_bid_duration_secs)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
