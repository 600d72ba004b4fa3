//! Scrape Gateway binary
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load configuration from environment variables
//! 3. Build the store, provider client and router
//! 4. Start the expiry sweep
//! 5. Serve until drained, or hand off to a serverless host

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrape_gateway::{
    cache::CachePolicy, create_router, lifecycle, spawn_cleanup_task, AppState, Config,
    LifecycleController, MemoryStore, RemoteProvider, ServeOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to info, override with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrape_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scrape Gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: env={}, port={}, upstream={}, default_ttl={}s, long_ttl={}s, max_entries={}",
        config.deployment_env,
        config.server_port,
        config.upstream_url,
        config.default_ttl,
        config.long_ttl,
        config.max_entries
    );

    let store = Arc::new(MemoryStore::new(config.max_entries));
    let provider = Arc::new(RemoteProvider::new(config.upstream_url.clone())?);
    let state = AppState::new(store.clone(), CachePolicy::from_config(&config), provider);
    let app = create_router(state, &config);

    let controller = Arc::new(LifecycleController::new(config.shutdown_grace));
    if !config.deployment_env.is_serverless() {
        spawn_cleanup_task(store, config.cleanup_interval, controller.clone());
    }

    match lifecycle::run(&config, app, controller).await? {
        ServeOutcome::Hosted(env) => info!("Handing request serving to {}", env),
        outcome => info!("Gateway stopped: {:?}", outcome),
    }

    Ok(())
}
