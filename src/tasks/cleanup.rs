//! Expiry Sweep Task
//!
//! Reads already drop expired entries; the sweep reclaims the ones nobody
//! reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::MemoryStore;
use crate::lifecycle::LifecycleController;

/// Spawns the periodic sweep over `store`. The task ends once the process
/// starts draining.
pub fn spawn_cleanup_task(
    store: Arc<MemoryStore>,
    cleanup_interval_secs: u64,
    controller: Arc<LifecycleController>,
) -> JoinHandle<()> {
    let period = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep with interval of {} seconds",
            period.as_secs()
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = controller.wait_for_drain() => {
                    debug!("Expiry sweep stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.cleanup_expired().await;
                    if removed > 0 {
                        info!("Expiry sweep: removed {} expired entries", removed);
                    } else {
                        debug!("Expiry sweep: no expired entries found");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::lifecycle::ShutdownTrigger;
    use serde_json::json;

    fn controller() -> Arc<LifecycleController> {
        let controller = Arc::new(LifecycleController::new(Duration::from_secs(1)));
        controller.mark_serving();
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let store = Arc::new(MemoryStore::new(100));
        store.set("short", json!("soon gone"), 1).await.unwrap();
        store.set("long", json!("stays"), 3600).await.unwrap();

        let ctrl = controller();
        let handle = spawn_cleanup_task(store.clone(), 1, ctrl.clone());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("long").await.unwrap(), Some(json!("stays")));

        ctrl.shutdown(ShutdownTrigger::Terminate);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_stops_on_drain() {
        let store = Arc::new(MemoryStore::new(10));
        let ctrl = controller();
        let handle = spawn_cleanup_task(store, 60, ctrl.clone());

        ctrl.shutdown(ShutdownTrigger::Interrupt);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep should stop once draining")
            .unwrap();
    }
}
