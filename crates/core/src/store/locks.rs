//! Per-device lock table with bounded acquisition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::StoreError;
use crate::types::DeviceId;

/// Held while a device's record is being read, decided on and written.
/// Dropping it releases the device.
#[derive(Debug)]
pub struct DeviceLock {
    id: DeviceId,
    _guard: OwnedMutexGuard<()>,
}

impl DeviceLock {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One async mutex per device id, created on demand.
#[derive(Debug, Default)]
pub struct DeviceLocks {
    slots: Mutex<HashMap<DeviceId, Arc<AsyncMutex<()>>>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `id`, giving up after `timeout`.
    pub async fn acquire(&self, id: &str, timeout: Duration) -> Result<DeviceLock, StoreError> {
        let slot = self.slot(id);
        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(DeviceLock {
                id: id.to_string(),
                _guard: guard,
            }),
            Err(_) => Err(StoreError::LockTimeout {
                id: id.to_string(),
                waited: timeout,
            }),
        }
    }

    /// Number of ids with a live slot.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.table();
        // Slots referenced only by the table are idle and can be dropped.
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Arc::clone(slots.entry(id.to_string()).or_default())
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<DeviceId, Arc<AsyncMutex<()>>>> {
        // The table holds no invariants a panicking holder could break.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
