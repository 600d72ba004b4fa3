//! Cache Statistics Module
//!
//! Counters for the in-memory store and for the cache-aside executor.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Store-level counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    /// Entries currently held
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// hits / (hits + misses), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Executor Stats ==
/// Lock-free counters updated by the cache-aside executor.
#[derive(Debug, Default)]
pub struct ExecutorStats {
    hits: AtomicU64,
    fetches: AtomicU64,
    coalesced: AtomicU64,
    bypassed: AtomicU64,
    upstream_failures: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of [`ExecutorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStatsSnapshot {
    /// Requests answered from the store
    pub hits: u64,
    /// Upstream fetches started (one per leader)
    pub fetches: u64,
    /// Requests that joined a fetch already in flight
    pub coalesced: u64,
    /// Requests with a zero TTL
    pub bypassed: u64,
    /// Fetches that failed
    pub upstream_failures: u64,
    /// Store reads or writes that failed and were degraded around
    pub store_failures: u64,
}

impl ExecutorStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExecutorStatsSnapshot {
        ExecutorStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        stats.set_total_entries(42);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.total_entries, 42);
    }

    #[test]
    fn test_executor_snapshot() {
        let stats = ExecutorStats::default();
        stats.record_fetch();
        stats.record_coalesced();
        stats.record_coalesced();
        stats.record_store_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.fetches, 1);
        assert_eq!(snap.coalesced, 2);
        assert_eq!(snap.store_failures, 1);
        assert_eq!(snap.hits, 0);
    }
}
