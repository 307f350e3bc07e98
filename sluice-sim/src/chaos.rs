//! Background operator that toggles a backend between crashed and recovered.

use std::sync::Arc;
use std::time::Duration;

use sluice_core::{BackendId, Router};
use tokio::task::JoinHandle;
use tokio::time;

/// Spawns a background Tokio task that flips `backend`'s health every
/// `interval`, starting with a crash. Stops when the backend leaves the router.
pub fn spawn_chaos(router: Arc<Router>, backend: BackendId, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);

        // Prevent immediately ticking when spawned
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(target) = router.server(&backend) else {
                tracing::info!(backend = %backend, "chaos target gone, stopping");
                return;
            };

            if target.is_alive() {
                target.crash();
            } else {
                target.recover();
            }
        }
    })
}
