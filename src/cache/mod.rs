//! Cache Module
//!
//! Cache-aside layer of the gateway: the pluggable store, the executor that
//! coalesces upstream fetches, and the policy that names and times entries.

mod entry;
mod executor;
mod lru;
mod policy;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use executor::{current_flight, CacheAside, InFlightRegistry};
pub use lru::LruTracker;
pub use policy::{CacheConfig, CachePolicy, Route, TtlClass};
pub use stats::{CacheStats, ExecutorStats, ExecutorStatsSnapshot};
pub use store::{CacheStore, MemoryMap, MemoryStore};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;
