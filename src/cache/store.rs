//! Cache Store Module
//!
//! The pluggable store contract the executor reads through, and the bounded
//! in-memory implementation used by default.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH};
use crate::error::{GatewayError, Result};

// == Store Contract ==
/// Key-value store with per-entry expiry in seconds.
///
/// Implementations are shared between requests and must be safe to call
/// concurrently. Any error is reported as [`GatewayError::CacheUnavailable`].
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Returns the live value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key` for `ttl_seconds`.
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()>;

    /// Whether a live value exists for `key`.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Store counters, when the implementation keeps them.
    async fn stats(&self) -> Option<CacheStats> {
        None
    }
}

// == Memory Map ==
/// Synchronous LRU + TTL map backing [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryMap {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    max_entries: usize,
}

impl MemoryMap {
    /// Creates an empty map holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
        }
    }

    // == Set ==
    /// Stores a value, evicting the least recently used entry at capacity.
    ///
    /// A zero TTL would expire on arrival, so nothing is stored.
    pub fn set(&mut self, key: &str, value: Value, ttl_seconds: u64) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(GatewayError::CacheUnavailable(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if ttl_seconds == 0 {
            return Ok(());
        }

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            // Expired entries go first; they are dead weight anyway
            if self.cleanup_expired() == 0 {
                if let Some(evicted) = self.lru.evict_oldest() {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl_seconds));
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Returns the live value for `key`; expired entries are dropped.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                Some(value)
            }
            Some(_) => {
                self.remove(key);
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Like [`get`](Self::get) without touching recency or counters.
    pub fn contains_live(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| !e.is_expired())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Cleanup Expired ==
    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Memory Store ==
/// Process-local [`CacheStore`] over a locked [`MemoryMap`].
#[derive(Debug)]
pub struct MemoryStore {
    map: RwLock<MemoryMap>,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            map: RwLock::new(MemoryMap::new(max_entries)),
        }
    }

    /// Removes expired entries; used by the background sweep.
    pub async fn cleanup_expired(&self) -> usize {
        self.map.write().await.cleanup_expired()
    }

    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        // Write lock: reads update recency and counters
        Ok(self.map.write().await.get(key))
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()> {
        self.map.write().await.set(key, value, ttl_seconds)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.map.read().await.contains_live(key))
    }

    async fn stats(&self) -> Option<CacheStats> {
        Some(self.map.read().await.stats())
    }
}
