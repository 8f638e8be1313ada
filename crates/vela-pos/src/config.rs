//! # Engine Configuration
//!
//! Tunables for the transaction engine. Read-only after construction, so no
//! locking is needed; clone it into whatever owns it.

use std::time::Duration;

/// Configuration for the sale transaction engine.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use vela_pos::EngineConfig;
///
/// let config = EngineConfig::new().reservation_ttl(Duration::from_secs(60));
/// assert_eq!(config.reservation_ttl, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a stock reservation holds availability before the expiry
    /// sweep may reclaim it.
    ///
    /// Long enough for a checkout round-trip, short enough that an
    /// abandoned checkout frees its stock quickly.
    pub reservation_ttl: Duration,
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        EngineConfig {
            reservation_ttl: Duration::from_secs(120),
        }
    }

    /// Sets the reservation time-to-live.
    pub fn reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new()
    }
}
