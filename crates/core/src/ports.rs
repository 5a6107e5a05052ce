//! Collaborator interfaces consumed by the scan orchestrator.
//!
//! Implementations are expected to bound their own running time; the
//! orchestrator never retries or times them out itself.

use std::time::Duration;

use async_trait::async_trait;

use crate::alert::{AlertMessage, ChannelTargets, DeviceContext};
use crate::health::Verdict;
use crate::reading::DiskReading;

/// Why the reading source produced no data this cycle.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("reading source unavailable: {0}")]
    Unavailable(String),

    #[error("reading source timed out after {0:?}")]
    Timeout(Duration),

    #[error("reading source returned malformed output: {0}")]
    Malformed(String),
}

/// Produces the current reading snapshot for all devices.
#[async_trait]
pub trait DiskReadingSource: Send + Sync {
    async fn read(&self) -> Result<Vec<DiskReading>, SourceError>;
}

/// Delivers alerts to the operator. Best-effort.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `message` to every channel in `targets`.
    ///
    /// Returns `true` only when every configured channel accepted the
    /// message. Channel failures are independent of each other and are
    /// logged by the implementation.
    async fn send(
        &self,
        verdict: Verdict,
        device: &DeviceContext,
        message: &AlertMessage,
        targets: &ChannelTargets,
    ) -> bool;
}

/// Receives the full reading snapshot of each cycle. Best-effort.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Returns `false` when the write failed.
    async fn record(&self, readings: &[DiskReading]) -> bool;
}
