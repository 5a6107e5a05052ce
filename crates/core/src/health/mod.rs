//! Disk health state machine.
//!
//! A device is either [`DeviceState::Ok`] or [`DeviceState::BelowThreshold`],
//! derived solely from its latest health reading. The [`decision`] module
//! turns a reading plus the stored prior state into a [`Verdict`] and the
//! state update to persist.

pub mod decision;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Persisted health state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    /// Health is at or above the configured threshold.
    #[default]
    Ok,
    /// Health is strictly below the configured threshold.
    BelowThreshold,
}

impl DeviceState {
    /// Canonical storage / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::Ok => "OK",
            DeviceState::BelowThreshold => "BELOW_THRESHOLD",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(DeviceState::Ok),
            "BELOW_THRESHOLD" => Ok(DeviceState::BelowThreshold),
            other => Err(CoreError::Validation(format!(
                "unknown device state '{other}'"
            ))),
        }
    }
}

/// Outcome of evaluating one reading: whether, and why, to notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Nothing to report.
    None,
    /// The device just dropped below the threshold.
    Transition,
    /// The device climbed back to or above the threshold.
    Recovery,
    /// The device is still below the threshold and the cooldown elapsed.
    Reminder,
}

impl Verdict {
    /// Whether this verdict results in a notification.
    pub fn is_alert(self) -> bool {
        !matches!(self, Verdict::None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
