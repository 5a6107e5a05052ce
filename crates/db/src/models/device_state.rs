//! Row model for the `disk_state` table.

use diskwarden_core::error::CoreError;
use diskwarden_core::health::DeviceState;
use diskwarden_core::store::{DeviceRecord, DeviceStatus};
use diskwarden_core::types::Timestamp;
use sqlx::FromRow;

/// A `disk_state` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct DiskStateRow {
    pub disk_id: String,
    pub device: String,
    pub serial_no: Option<String>,
    pub state: String,
    pub last_state_change: Option<Timestamp>,
    pub last_alert_time: Option<Timestamp>,
    pub health_percent: i64,
    pub updated_at: Timestamp,
}

/// Projection used by the status query.
#[derive(Debug, Clone, FromRow)]
pub struct DiskStatusRow {
    pub disk_id: String,
    pub state: String,
    pub health_percent: i64,
}

fn health_from_column(disk_id: &str, value: i64) -> Result<u8, CoreError> {
    u8::try_from(value)
        .ok()
        .filter(|h| *h <= 100)
        .ok_or_else(|| CoreError::Internal(format!("stored health {value} for {disk_id} is out of range")))
}

impl TryFrom<DiskStateRow> for DeviceRecord {
    type Error = CoreError;

    fn try_from(row: DiskStateRow) -> Result<Self, Self::Error> {
        let health_percent = health_from_column(&row.disk_id, row.health_percent)?;
        Ok(DeviceRecord {
            state: row.state.parse::<DeviceState>()?,
            id: row.disk_id,
            device: row.device,
            serial_no: row.serial_no,
            last_state_change: row.last_state_change,
            last_alert_time: row.last_alert_time,
            health_percent,
            updated_at: Some(row.updated_at),
        })
    }
}

impl TryFrom<&DiskStatusRow> for DeviceStatus {
    type Error = CoreError;

    fn try_from(row: &DiskStatusRow) -> Result<Self, Self::Error> {
        Ok(DeviceStatus {
            state: row.state.parse()?,
            health_percent: health_from_column(&row.disk_id, row.health_percent)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(state: &str, health: i64) -> DiskStateRow {
        DiskStateRow {
            disk_id: "WD-1".to_string(),
            device: "/dev/sda".to_string(),
            serial_no: Some("WD-1".to_string()),
            state: state.to_string(),
            last_state_change: None,
            last_alert_time: None,
            health_percent: health,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn valid_row_converts() {
        let record = DeviceRecord::try_from(row("BELOW_THRESHOLD", 70)).unwrap();
        assert_eq!(record.state, DeviceState::BelowThreshold);
        assert_eq!(record.health_percent, 70);
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn corrupt_state_is_rejected() {
        assert!(DeviceRecord::try_from(row("MAYBE", 70)).is_err());
    }

    #[test]
    fn out_of_range_health_is_rejected() {
        assert!(DeviceRecord::try_from(row("OK", 250)).is_err());
    }
}
