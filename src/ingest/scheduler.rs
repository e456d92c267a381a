// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ingest::SyncOrchestrator;

/// Spawn the periodic sync loop. The first run starts immediately; later runs
/// follow `interval`. Cancelling `shutdown` suppresses every run not yet
/// started, while a run already in flight finishes its current call.
pub fn spawn_sync_scheduler(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "sync", "sync scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match orchestrator.sync_all().await {
                Ok(summary) => tracing::debug!(
                    target: "sync",
                    succeeded = summary.succeeded(),
                    failed = summary.failed(),
                    "scheduled sync tick"
                ),
                Err(e) => tracing::error!(target: "sync", error = ?e, "scheduled sync failed"),
            }
        }
    })
}
