//! Periodic cleanup of device records that stopped reporting.
//!
//! Deletes records whose `updated_at` is older than `retentionDays` from the
//! current settings. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use diskwarden_core::store::StateStore;
use tokio_util::sync::CancellationToken;

use crate::settings::SettingsHandle;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the state retention loop until `cancel` is triggered.
pub async fn run(store: Arc<dyn StateStore>, settings: SettingsHandle, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "State retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("State retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let retention_days = settings.current().await.retention_days;
                match chrono::Duration::try_days(i64::from(retention_days)) {
                    Some(window) => {
                        store.cleanup(window).await;
                    }
                    None => tracing::warn!(retention_days, "State retention: window out of range, skipping"),
                }
            }
        }
    }
}
