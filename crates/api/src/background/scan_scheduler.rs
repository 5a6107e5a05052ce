//! Periodic scan trigger.
//!
//! Runs one cycle immediately (the startup scan), then one cycle per
//! `scanIntervalSeconds`. The interval is re-read from the settings after
//! every cycle, so a changed interval applies from the next wait.

use std::sync::Arc;
use std::time::Duration;

use diskwarden_scanner::{CycleOutcome, ScanOrchestrator};
use tokio_util::sync::CancellationToken;

use crate::settings::SettingsHandle;

/// Run the scan loop until `cancel` is triggered.
///
/// Each cycle runs on its own task, so an in-flight cycle is not
/// interrupted; cancellation is observed between cycles.
pub async fn run(
    orchestrator: Arc<ScanOrchestrator>,
    settings: SettingsHandle,
    cancel: CancellationToken,
) {
    tracing::info!("Scan scheduler started");

    loop {
        let current = settings.current().await;
        match orchestrator.spawn_cycle(current.clone()).await {
            Ok(CycleOutcome::Skipped) => {
                tracing::debug!("Scheduled scan skipped, another cycle is running");
            }
            Ok(CycleOutcome::Aborted { reason }) => {
                tracing::debug!(%reason, "Scheduled scan aborted");
            }
            Ok(CycleOutcome::Completed(_)) => {}
            Err(e) => tracing::error!(error = %e, "Scheduled scan task failed"),
        }

        let wait = Duration::from_secs(current.scan_interval_seconds.max(1));
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Scan scheduler stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
