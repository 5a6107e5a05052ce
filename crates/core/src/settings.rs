//! Operator-tunable monitor settings.
//!
//! A [`MonitorSettings`] value is handed to every scan cycle; nothing in the
//! scanner reads settings from a global.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alert::ChannelTargets;
use crate::error::CoreError;
use crate::health::decision::AlertPolicy;
use crate::types::DeviceId;

pub const DEFAULT_HEALTH_THRESHOLD: u8 = 90;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// One year.
pub const MAX_ALERT_COOLDOWN_MINUTES: i64 = 525_600;
/// One day.
pub const MAX_SCAN_INTERVAL_SECS: u64 = 86_400;
/// Ten years.
pub const MAX_RETENTION_DAYS: u32 = 3_650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    pub health_threshold: u8,
    /// `0` disables reminders.
    pub alert_cooldown_minutes: i64,
    pub notify_on_recovery: bool,
    /// Device ids exempt from alerting. They are still forwarded to metrics.
    pub disabled_disks: BTreeSet<DeviceId>,
    pub scan_interval_seconds: u64,
    pub retention_days: u32,
    /// Webhook endpoint for the messaging channel.
    pub webhook_url: Option<String>,
    /// Recipient for the email channel.
    pub email: Option<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            health_threshold: DEFAULT_HEALTH_THRESHOLD,
            alert_cooldown_minutes: 0,
            notify_on_recovery: false,
            disabled_disks: BTreeSet::new(),
            scan_interval_seconds: DEFAULT_SCAN_INTERVAL_SECS,
            retention_days: DEFAULT_RETENTION_DAYS,
            webhook_url: None,
            email: None,
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.health_threshold > 100 {
            return Err(CoreError::Validation(format!(
                "healthThreshold must be between 0 and 100, got {}",
                self.health_threshold
            )));
        }
        if !(0..=MAX_ALERT_COOLDOWN_MINUTES).contains(&self.alert_cooldown_minutes) {
            return Err(CoreError::Validation(format!(
                "alertCooldownMinutes must be between 0 and {MAX_ALERT_COOLDOWN_MINUTES}, got {}",
                self.alert_cooldown_minutes
            )));
        }
        if !(1..=MAX_SCAN_INTERVAL_SECS).contains(&self.scan_interval_seconds) {
            return Err(CoreError::Validation(format!(
                "scanIntervalSeconds must be between 1 and {MAX_SCAN_INTERVAL_SECS}, got {}",
                self.scan_interval_seconds
            )));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            return Err(CoreError::Validation(format!(
                "retentionDays must be between 1 and {MAX_RETENTION_DAYS}, got {}",
                self.retention_days
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            threshold: self.health_threshold,
            cooldown_minutes: self.alert_cooldown_minutes,
            notify_on_recovery: self.notify_on_recovery,
        }
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled_disks.contains(id)
    }

    /// Notification routing for this cycle. Blank values count as unset.
    pub fn channels(&self) -> ChannelTargets {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        ChannelTargets {
            webhook_url: non_blank(&self.webhook_url),
            email: non_blank(&self.email),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
