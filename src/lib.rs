//! Scrape Gateway - a caching HTTP gateway in front of slow scraping sources
//!
//! Coalesces identical upstream fetches, caches their results with
//! per-route TTLs, and shuts down gracefully when run as a standalone
//! process.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod provider;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheAside, CachePolicy, CacheStore, MemoryStore};
pub use config::Config;
pub use error::{GatewayError, Result};
pub use lifecycle::{DeploymentEnv, LifecycleController, ServeOutcome};
pub use provider::{MangaProvider, RemoteProvider};
pub use tasks::spawn_cleanup_task;
