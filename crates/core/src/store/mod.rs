//! Durable per-device state and the interface the scanner persists through.
//!
//! The get -> decide -> upsert sequence for one device must not interleave
//! with another such sequence for the same device. Callers take a
//! [`DeviceLock`] from [`StateStore::lock`] (a bounded wait) and hold it
//! across the whole sequence.

pub mod locks;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::health::decision::{Decision, PriorState};
use crate::health::DeviceState;
use crate::types::{DeviceId, Timestamp};

pub use locks::{DeviceLock, DeviceLocks};

/// Stored state for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub device: String,
    pub serial_no: Option<String>,
    pub state: DeviceState,
    pub last_state_change: Option<Timestamp>,
    pub last_alert_time: Option<Timestamp>,
    pub health_percent: u8,
    /// `None` until the record is first written.
    pub updated_at: Option<Timestamp>,
}

impl DeviceRecord {
    /// The record of a device that has never been observed: OK, no history.
    pub fn unseen(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            device: String::new(),
            serial_no: None,
            state: DeviceState::Ok,
            last_state_change: None,
            last_alert_time: None,
            health_percent: 0,
            updated_at: None,
        }
    }

    pub fn prior(&self) -> PriorState {
        PriorState {
            state: self.state,
            last_state_change: self.last_state_change,
            last_alert_time: self.last_alert_time,
        }
    }

    /// The record to persist after `decision`, refreshing display metadata.
    pub fn advance(
        &self,
        device: &str,
        serial_no: Option<&str>,
        health_percent: u8,
        decision: &Decision,
        now: Timestamp,
    ) -> Self {
        Self {
            id: self.id.clone(),
            device: device.to_string(),
            serial_no: serial_no.map(str::to_string),
            state: decision.new_state,
            last_state_change: decision.last_state_change,
            last_alert_time: decision.last_alert_time,
            health_percent,
            updated_at: Some(now),
        }
    }
}

/// Per-device summary for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub state: DeviceState,
    pub health_percent: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("timed out after {waited:?} waiting for the record lock of {id}")]
    LockTimeout {
        id: DeviceId,
        waited: std::time::Duration,
    },

    #[error("state storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable device state.
///
/// `get`, `upsert`, `all` and `cleanup` never fail the caller: storage
/// errors are logged by the implementation and degrade to the documented
/// fallback (default OK record, dropped write, empty map, nothing removed).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Exclusive access to `id`'s record, waiting at most the store's lock timeout.
    async fn lock(&self, id: &str) -> Result<DeviceLock, StoreError>;

    /// Stored record, or [`DeviceRecord::unseen`] on a miss or storage failure.
    async fn get(&self, id: &str) -> DeviceRecord;

    /// Atomically replace the record for `record.id`. Returns `false` if the
    /// write was dropped.
    async fn upsert(&self, record: &DeviceRecord) -> bool;

    /// State and health of every tracked device.
    async fn all(&self) -> BTreeMap<DeviceId, DeviceStatus>;

    /// Delete records whose `updated_at` is older than `now - retention`.
    /// Returns the number of records removed.
    async fn cleanup(&self, retention: chrono::Duration) -> u64;

    /// Strict lookup that distinguishes a miss from a storage failure.
    async fn find(&self, id: &str) -> Result<Option<DeviceRecord>, StoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
