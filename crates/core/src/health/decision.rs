//! Alert decision engine.
//!
//! Pure logic with no storage access. The caller loads the prior state,
//! calls [`decide`], persists the returned [`Decision`] and dispatches the
//! verdict.

use chrono::Duration;

use crate::health::{DeviceState, Verdict};
use crate::types::Timestamp;

/// Alerting parameters in effect for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Minimum acceptable health score (0-100).
    pub threshold: u8,
    /// Minutes between reminders while a device stays faulted. `<= 0` disables reminders.
    pub cooldown_minutes: i64,
    /// Whether a return to OK is reported.
    pub notify_on_recovery: bool,
}

/// What the store knows about a device before this evaluation.
///
/// An unseen device is `PriorState::default()`: OK with no history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorState {
    pub state: DeviceState,
    pub last_state_change: Option<Timestamp>,
    pub last_alert_time: Option<Timestamp>,
}

/// Result of one evaluation: the verdict plus the state update to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub new_state: DeviceState,
    pub verdict: Verdict,
    pub last_state_change: Option<Timestamp>,
    pub last_alert_time: Option<Timestamp>,
}

/// Map a health score onto a state. A score equal to the threshold is OK.
pub fn classify(health_percent: u8, threshold: u8) -> DeviceState {
    if health_percent < threshold {
        DeviceState::BelowThreshold
    } else {
        DeviceState::Ok
    }
}

/// Evaluate a reading against the prior state.
///
/// `last_state_change` advances only on a transition (or is stamped on a
/// device's first record); `last_alert_time` advances only when the verdict
/// is not [`Verdict::None`].
pub fn decide(
    health_percent: u8,
    policy: &AlertPolicy,
    prior: &PriorState,
    now: Timestamp,
) -> Decision {
    let new_state = classify(health_percent, policy.threshold);

    let verdict = match (prior.state, new_state) {
        (DeviceState::Ok, DeviceState::BelowThreshold) => Verdict::Transition,
        (DeviceState::BelowThreshold, DeviceState::Ok) => {
            if policy.notify_on_recovery {
                Verdict::Recovery
            } else {
                Verdict::None
            }
        }
        (DeviceState::BelowThreshold, DeviceState::BelowThreshold) => {
            if reminder_due(policy.cooldown_minutes, prior.last_alert_time, now) {
                Verdict::Reminder
            } else {
                Verdict::None
            }
        }
        (DeviceState::Ok, DeviceState::Ok) => Verdict::None,
    };

    let last_state_change = if new_state != prior.state || prior.last_state_change.is_none() {
        Some(now)
    } else {
        prior.last_state_change
    };

    let last_alert_time = if verdict.is_alert() {
        Some(now)
    } else {
        prior.last_alert_time
    };

    Decision {
        new_state,
        verdict,
        last_state_change,
        last_alert_time,
    }
}

/// A cooldown too large to represent is never due.
fn reminder_due(cooldown_minutes: i64, last_alert: Option<Timestamp>, now: Timestamp) -> bool {
    if cooldown_minutes <= 0 {
        return false;
    }
    let Some(last) = last_alert else {
        return true;
    };
    Duration::try_minutes(cooldown_minutes)
        .and_then(|cooldown| last.checked_add_signed(cooldown))
        .is_some_and(|due| now >= due)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
