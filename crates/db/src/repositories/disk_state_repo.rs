//! Repository for the `disk_state` table (one row per device).

use diskwarden_core::store::DeviceRecord;
use diskwarden_core::types::Timestamp;

use crate::models::device_state::{DiskStateRow, DiskStatusRow};
use crate::DbPool;

/// Column list for `disk_state` SELECT queries.
const COLUMNS: &str = "\
    disk_id, device, serial_no, state, \
    last_state_change, last_alert_time, health_percent, updated_at";

/// Provides query operations for device state.
pub struct DiskStateRepo;

impl DiskStateRepo {
    /// Find the row for a device, if any.
    pub async fn find(pool: &DbPool, disk_id: &str) -> Result<Option<DiskStateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM disk_state WHERE disk_id = ?1");
        sqlx::query_as::<_, DiskStateRow>(&query)
            .bind(disk_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or fully replace the row for `record.id` in a single statement.
    ///
    /// `updated_at` falls back to `now` when the record has never been written.
    pub async fn upsert(
        pool: &DbPool,
        record: &DeviceRecord,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO disk_state \
                (disk_id, device, serial_no, state, last_state_change, \
                 last_alert_time, health_percent, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT (disk_id) DO UPDATE SET \
                device = excluded.device, \
                serial_no = excluded.serial_no, \
                state = excluded.state, \
                last_state_change = excluded.last_state_change, \
                last_alert_time = excluded.last_alert_time, \
                health_percent = excluded.health_percent, \
                updated_at = excluded.updated_at",
        )
        .bind(&record.id)
        .bind(&record.device)
        .bind(record.serial_no.as_deref())
        .bind(record.state.as_str())
        .bind(record.last_state_change)
        .bind(record.last_alert_time)
        .bind(i64::from(record.health_percent))
        .bind(record.updated_at.unwrap_or(now))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// State and health for every tracked device, ordered by id.
    pub async fn list_status(pool: &DbPool) -> Result<Vec<DiskStatusRow>, sqlx::Error> {
        sqlx::query_as::<_, DiskStatusRow>(
            "SELECT disk_id, state, health_percent FROM disk_state ORDER BY disk_id",
        )
        .fetch_all(pool)
        .await
    }

    /// Delete rows not updated since `cutoff`.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &DbPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM disk_state WHERE updated_at < ?1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
