//! Background eviction of stale client records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::engine::AdmissionEngine;

/// Spawn a task that sweeps `engine` every `clean_period` until `shutdown` is cancelled.
///
/// The first sweep runs immediately. A record is removed once it has gone
/// unseen for longer than the engine's cooldown period. `clean_period` must be
/// non-zero.
pub fn spawn_sweeper(
    engine: Arc<AdmissionEngine>,
    clean_period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(clean_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            clean_period_secs = clean_period.as_secs(),
            "Client record sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let before = engine.tracked_networks();
                    let removed = engine.sweep(Instant::now());
                    if removed > 0 {
                        info!(
                            before,
                            after = before.saturating_sub(removed),
                            removed,
                            "Client record sweep completed"
                        );
                    } else {
                        debug!(tracked = before, "Client record sweep found nothing to remove");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Client record sweeper shutting down");
                    break;
                }
            }
        }
    })
}
