//! Disk health readings as delivered by the reading source.

use serde::{Deserialize, Serialize};

use crate::types::DeviceId;

/// Serial numbers the diagnostic tooling emits when the real one is unknown.
const UNKNOWN_SERIALS: [&str; 3] = ["?", "N/A", "unknown"];

/// One point-in-time health measurement for a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskReading {
    /// Device path, e.g. `/dev/sda`.
    pub device: String,
    #[serde(default)]
    pub serial_no: Option<String>,
    /// Health score. Valid readings are 0-100.
    pub health_percent: i64,
    #[serde(default)]
    pub model_id: Option<String>,
    /// Current temperature in degrees Celsius.
    #[serde(default)]
    pub temp: Option<i64>,
    /// Highest recorded temperature in degrees Celsius.
    #[serde(default)]
    pub highest_temp: Option<i64>,
    /// Performance score (0-100).
    #[serde(default)]
    pub performance: Option<i64>,
    #[serde(default)]
    pub power_on_hours: Option<i64>,
    /// Estimated remaining lifetime in days.
    #[serde(default)]
    pub lifetime_days: Option<i64>,
}

/// Why a reading cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadingError {
    #[error("reading has neither a serial number nor a device path")]
    MissingIdentity,

    #[error("health {value} for {id} is outside 0-100")]
    HealthOutOfRange { id: DeviceId, value: i64 },
}

impl DiskReading {
    /// Serial number when it carries real information.
    pub fn known_serial(&self) -> Option<&str> {
        self.serial_no
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !UNKNOWN_SERIALS.contains(s))
    }

    /// Stable identity: the serial number if known, else the device path.
    pub fn identity(&self) -> Result<DeviceId, ReadingError> {
        if let Some(serial) = self.known_serial() {
            return Ok(serial.to_string());
        }
        let device = self.device.trim();
        if device.is_empty() {
            return Err(ReadingError::MissingIdentity);
        }
        Ok(device.to_string())
    }

    /// Health score, rejected when outside 0-100.
    pub fn health(&self) -> Result<u8, ReadingError> {
        u8::try_from(self.health_percent)
            .ok()
            .filter(|h| *h <= 100)
            .ok_or_else(|| ReadingError::HealthOutOfRange {
                id: self.identity().unwrap_or_else(|_| self.device.clone()),
                value: self.health_percent,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(device: &str, serial: Option<&str>, health: i64) -> DiskReading {
        DiskReading {
            device: device.to_string(),
            serial_no: serial.map(str::to_string),
            health_percent: health,
            model_id: None,
            temp: None,
            highest_temp: None,
            performance: None,
            power_on_hours: None,
            lifetime_days: None,
        }
    }

    #[test]
    fn identity_prefers_serial() {
        let r = reading("/dev/sda", Some("WD-123"), 99);
        assert_eq!(r.identity().unwrap(), "WD-123");
    }

    #[test]
    fn identity_falls_back_to_device() {
        for serial in [None, Some(""), Some("  "), Some("?"), Some("N/A")] {
            let r = reading("/dev/sdb", serial, 99);
            assert_eq!(r.identity().unwrap(), "/dev/sdb", "serial={serial:?}");
        }
    }

    #[test]
    fn missing_identity_is_malformed() {
        let r = reading("", None, 99);
        assert_eq!(r.identity(), Err(ReadingError::MissingIdentity));
    }

    #[test]
    fn health_range_is_enforced() {
        assert_eq!(reading("/dev/sda", None, 0).health().unwrap(), 0);
        assert_eq!(reading("/dev/sda", None, 100).health().unwrap(), 100);
        assert!(reading("/dev/sda", None, 101).health().is_err());
        assert!(reading("/dev/sda", None, -1).health().is_err());
    }

    #[test]
    fn deserializes_minimal_reading() {
        let json = r#"{"device": "/dev/nvme0n1", "health_percent": 97}"#;
        let r: DiskReading = serde_json::from_str(json).unwrap();
        assert_eq!(r.identity().unwrap(), "/dev/nvme0n1");
        assert_eq!(r.health().unwrap(), 97);
        assert!(r.temp.is_none());
    }
}
