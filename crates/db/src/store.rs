//! SQLite-backed [`StateStore`].
//!
//! Writes are single `INSERT ... ON CONFLICT` statements, so a record is
//! either fully replaced or left untouched. Cross-cycle exclusion for one
//! device comes from the in-process [`DeviceLocks`] table.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diskwarden_core::store::{
    DeviceLock, DeviceLocks, DeviceRecord, DeviceStatus, StateStore, StoreError,
};
use diskwarden_core::types::DeviceId;

use crate::repositories::DiskStateRepo;
use crate::DbPool;

/// Default bounded wait for a device record lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStateStore {
    pool: DbPool,
    locks: DeviceLocks,
    lock_timeout: Duration,
}

impl SqliteStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            locks: DeviceLocks::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn lock(&self, id: &str) -> Result<DeviceLock, StoreError> {
        self.locks.acquire(id, self.lock_timeout).await
    }

    async fn get(&self, id: &str) -> DeviceRecord {
        match self.find(id).await {
            Ok(Some(record)) => record,
            Ok(None) => DeviceRecord::unseen(id),
            Err(e) => {
                tracing::error!(disk_id = id, error = %e, "State read failed, assuming OK");
                DeviceRecord::unseen(id)
            }
        }
    }

    async fn upsert(&self, record: &DeviceRecord) -> bool {
        match DiskStateRepo::upsert(&self.pool, record, Utc::now()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(disk_id = %record.id, error = %e, "State write failed, dropping update");
                false
            }
        }
    }

    async fn all(&self) -> BTreeMap<DeviceId, DeviceStatus> {
        let rows = match DiskStateRepo::list_status(&self.pool).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read device states");
                return BTreeMap::new();
            }
        };

        rows.iter()
            .filter_map(|row| match DeviceStatus::try_from(row) {
                Ok(status) => Some((row.disk_id.clone(), status)),
                Err(e) => {
                    tracing::warn!(disk_id = %row.disk_id, error = %e, "Skipping corrupt state row");
                    None
                }
            })
            .collect()
    }

    async fn cleanup(&self, retention: chrono::Duration) -> u64 {
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            tracing::debug!(?retention, "State retention: window exceeds time range, nothing to purge");
            return 0;
        };
        match DiskStateRepo::delete_older_than(&self.pool, cutoff).await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(deleted, %cutoff, "State retention: purged stale devices");
                } else {
                    tracing::debug!("State retention: no rows to purge");
                }
                deleted
            }
            Err(e) => {
                tracing::error!(error = %e, "State retention: cleanup failed");
                0
            }
        }
    }

    async fn find(&self, id: &str) -> Result<Option<DeviceRecord>, StoreError> {
        let row = DiskStateRepo::find(&self.pool, id)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        row.map(DeviceRecord::try_from)
            .transpose()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
