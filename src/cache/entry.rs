//! Cache Entry Module
//!
//! A stored upstream result together with the moment it was stored and its TTL.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

// == Cache Entry ==
/// A single cached upstream result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored JSON value
    pub value: Value,
    /// When the entry was written
    pub stored_at: Instant,
    /// How long the entry stays valid
    pub ttl: Duration,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stored now with the given TTL in seconds.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Instant at which the entry stops being served; `None` when that lies
    /// beyond what the clock can represent, i.e. never.
    pub fn expires_at(&self) -> Option<Instant> {
        self.stored_at.checked_add(self.ttl)
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches `stored_at + ttl`.
    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }

    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        match self.expires_at() {
            Some(expires_at) => expires_at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }
}
