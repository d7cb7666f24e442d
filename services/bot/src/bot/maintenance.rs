//! services/bot/src/bot/maintenance.rs
//!
//! Background upkeep owned by the process, started from the binary.

use crate::bot::delivery::MessageDelivery;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically evicts stale entries from the delivery edit cache until `shutdown` fires.
pub fn spawn_cache_sweeper(
    delivery: Arc<MessageDelivery>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Cache sweeper stopped.");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = delivery.cleanup(Instant::now());
                    if evicted > 0 {
                        info!(evicted, remaining = delivery.cached_len(), "Edit cache swept.");
                    }
                }
            }
        }
    })
}
