//! Cache-Aside Executor
//!
//! Wraps every upstream call: look the key up in the store, and on a miss run
//! the fetcher once per key no matter how many requests are waiting on it.
//!
//! The first request to miss becomes the leader and registers a pending
//! flight in the [`InFlightRegistry`]; requests for the same key arriving
//! before the flight settles follow it and receive the leader's outcome. The
//! fetch itself runs on its own task, so a caller going away does not cancel
//! it and the result still lands in the store.
//!
//! A flight is stored with the longest TTL any of its waiters asked for, so a
//! bypassing leader does not keep caching followers from populating the
//! store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{CacheStore, ExecutorStats, ExecutorStatsSnapshot};
use crate::error::{GatewayError, Result};

/// What a settled flight hands to its waiters.
type Outcome = Result<Value>;

type Slot = watch::Receiver<Option<Outcome>>;

tokio::task_local! {
    static FLIGHT_KEY: String;
}

/// Key of the upstream fetch running on the current task, if any.
///
/// Lets a panic hook tell a failing fetch, which only fails its own
/// waiters, apart from a fault in the rest of the process.
pub fn current_flight() -> Option<String> {
    FLIGHT_KEY.try_with(String::clone).ok()
}

#[derive(Debug)]
struct Flight {
    id: u64,
    slot: Slot,
    ttl_seconds: Arc<AtomicU64>,
}

// == In-Flight Registry ==
/// Pending fetches keyed by cache key; at most one per key.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    pending: Mutex<HashMap<String, Flight>>,
    next_id: Mutex<u64>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, Flight>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the flight for `key`, opening one if none is pending.
    ///
    /// Returns the receiver every waiter listens on, plus a guard when the
    /// caller is the leader and therefore responsible for settling it. The
    /// flight's TTL is raised to `ttl_seconds` if that is longer.
    fn join(self: &Arc<Self>, key: &str, ttl_seconds: u64) -> (Slot, Option<FlightGuard>) {
        let mut pending = self.pending();
        if let Some(flight) = pending.get(key) {
            flight.ttl_seconds.fetch_max(ttl_seconds, Ordering::AcqRel);
            return (flight.slot.clone(), None);
        }

        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        let (tx, rx) = watch::channel(None);
        let ttl_seconds = Arc::new(AtomicU64::new(ttl_seconds));
        pending.insert(
            key.to_string(),
            Flight {
                id,
                slot: rx.clone(),
                ttl_seconds: Arc::clone(&ttl_seconds),
            },
        );

        let guard = FlightGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            id,
            tx,
            ttl_seconds,
            settled: false,
        };
        (rx, Some(guard))
    }

    /// Removes the flight for `key` if it is still the one numbered `id`.
    fn remove(&self, key: &str, id: u64) {
        let mut pending = self.pending();
        if pending.get(key).is_some_and(|flight| flight.id == id) {
            pending.remove(key);
        }
    }

    /// Number of fetches currently pending.
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Leader's handle on a flight.
///
/// Settling unregisters the flight before publishing, so a request that
/// arrives after the leader returned never joins a finished flight. Dropping
/// an unsettled guard (the fetch task panicked) unregisters it as well, and
/// waiters observe the closed channel.
struct FlightGuard {
    registry: Arc<InFlightRegistry>,
    key: String,
    id: u64,
    tx: watch::Sender<Option<Outcome>>,
    ttl_seconds: Arc<AtomicU64>,
    settled: bool,
}

impl FlightGuard {
    /// Longest TTL requested by any waiter so far.
    fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds.load(Ordering::Acquire)
    }

    fn settle(mut self, outcome: Outcome) {
        self.registry.remove(&self.key, self.id);
        self.settled = true;
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.remove(&self.key, self.id);
        }
    }
}

// == Cache-Aside Executor ==
/// Get-or-compute over a [`CacheStore`] with per-key request coalescing.
///
/// Store failures never fail a request: reads fall through to the fetcher
/// and writes are best effort.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    inflight: Arc<InFlightRegistry>,
    stats: Arc<ExecutorStats>,
}

impl CacheAside {
    /// Creates an executor with a fresh in-flight registry.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_registry(store, Arc::new(InFlightRegistry::new()))
    }

    pub fn with_registry(store: Arc<dyn CacheStore>, inflight: Arc<InFlightRegistry>) -> Self {
        Self {
            store,
            inflight,
            stats: Arc::new(ExecutorStats::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Fetches currently pending.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    pub fn stats(&self) -> ExecutorStatsSnapshot {
        self.stats.snapshot()
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key` or computes, stores and returns it.
    ///
    /// A `ttl_seconds` of 0 skips the store in both directions but still
    /// coalesces concurrent identical requests. A fetcher failure reaches
    /// every waiter as [`GatewayError::UpstreamFailure`] and nothing is
    /// stored.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl_seconds: u64, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if key.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "cache key must not be empty".to_string(),
            ));
        }

        if ttl_seconds == 0 {
            self.stats.record_bypass();
        } else if let Some(value) = self.read_through(key).await {
            match serde_json::from_value(value) {
                Ok(hit) => {
                    self.stats.record_hit();
                    debug!("Cache hit for {}", key);
                    return Ok(hit);
                }
                Err(err) => warn!("Discarding undecodable cache entry for {}: {}", key, err),
            }
        }

        let value = self.join_flight(key, ttl_seconds, fetcher).await?;
        serde_json::from_value(value).map_err(|err| {
            GatewayError::Internal(format!("value for {} has an unexpected shape: {}", key, err))
        })
    }

    async fn read_through(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(err) => {
                self.stats.record_store_failure();
                warn!("Cache read failed for {}, computing uncached: {}", key, err);
                None
            }
        }
    }

    async fn join_flight<T, F, Fut>(&self, key: &str, ttl_seconds: u64, fetcher: F) -> Outcome
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (mut slot, leader) = self.inflight.join(key, ttl_seconds);

        match leader {
            Some(guard) => {
                self.stats.record_fetch();
                debug!("Cache miss for {}, fetching upstream", key);
                tokio::spawn(FLIGHT_KEY.scope(
                    key.to_string(),
                    run_flight(guard, Arc::clone(&self.store), Arc::clone(&self.stats), fetcher),
                ));
            }
            None => {
                self.stats.record_coalesced();
                debug!("Joining in-flight fetch for {}", key);
            }
        }

        let settled = match slot.wait_for(Option::is_some).await {
            Ok(outcome) => Option::clone(&outcome),
            Err(_) => None,
        };

        settled.unwrap_or_else(|| {
            Err(GatewayError::upstream(anyhow::anyhow!(
                "upstream fetch for {} was aborted",
                key
            )))
        })
    }
}

/// Runs the leader's fetch, stores a success and settles the flight.
async fn run_flight<T, F, Fut>(
    guard: FlightGuard,
    store: Arc<dyn CacheStore>,
    stats: Arc<ExecutorStats>,
    fetcher: F,
) where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let fetched = fetcher()
        .await
        .and_then(|data| serde_json::to_value(data).map_err(anyhow::Error::from));

    let outcome = match fetched {
        Ok(value) => {
            let ttl_seconds = guard.ttl_seconds();
            if ttl_seconds > 0 {
                if let Err(err) = store.set(&guard.key, value.clone(), ttl_seconds).await {
                    stats.record_store_failure();
                    warn!("Cache write failed for {}: {}", guard.key, err);
                }
            }
            Ok(value)
        }
        Err(err) => {
            stats.record_upstream_failure();
            warn!("Upstream fetch failed for {}: {:#}", guard.key, err);
            Err(GatewayError::upstream(err))
        }
    };

    guard.settle(outcome);
}
