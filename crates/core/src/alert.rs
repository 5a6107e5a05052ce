//! Alert payloads handed to notification channels.

use serde::Serialize;

use crate::health::Verdict;
use crate::types::DeviceId;

/// Prefix for email subjects.
const SUBJECT_PREFIX: &str = "[DiskWarden]";

/// Placeholder for an unknown serial number in messages.
const NO_SERIAL: &str = "N/A";

/// Where notifications go this cycle. Unset targets are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelTargets {
    pub webhook_url: Option<String>,
    pub email: Option<String>,
}

impl ChannelTargets {
    pub fn is_empty(&self) -> bool {
        self.webhook_url.is_none() && self.email.is_none()
    }
}

/// The device an alert is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceContext {
    pub id: DeviceId,
    pub device: String,
    pub serial_no: Option<String>,
    pub health_percent: u8,
    pub threshold: u8,
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub verdict: Verdict,
    /// Short title, e.g. `Disk Health Alert`.
    pub headline: &'static str,
    /// One-line description of the device and its health.
    pub detail: String,
}

impl AlertMessage {
    /// Render the message for a verdict. Returns `None` for [`Verdict::None`].
    pub fn compose(verdict: Verdict, ctx: &DeviceContext) -> Option<Self> {
        let device = if ctx.device.is_empty() {
            "Unknown"
        } else {
            ctx.device.as_str()
        };
        let serial = ctx.serial_no.as_deref().unwrap_or(NO_SERIAL);
        let (headline, detail) = match verdict {
            Verdict::None => return None,
            Verdict::Transition => (
                "Disk Health Alert",
                format!(
                    "{device} (SN: {serial}) has health {}% (threshold: {}%)",
                    ctx.health_percent, ctx.threshold
                ),
            ),
            Verdict::Recovery => (
                "Disk Recovered",
                format!(
                    "{device} (SN: {serial}) health recovered to {}%",
                    ctx.health_percent
                ),
            ),
            Verdict::Reminder => (
                "Disk Health Reminder",
                format!(
                    "{device} (SN: {serial}) still at {}% (threshold: {}%)",
                    ctx.health_percent, ctx.threshold
                ),
            ),
        };
        Some(Self {
            verdict,
            headline,
            detail,
        })
    }

    /// A free-form message, used for channel tests.
    pub fn plain(headline: &'static str, detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::None,
            headline,
            detail: detail.into(),
        }
    }

    /// Plain-text form, used for email bodies and logs.
    pub fn text(&self) -> String {
        format!("{}: {}", self.headline, self.detail)
    }

    /// Chat-style form with an icon and bold headline, used for webhooks.
    pub fn markdown(&self) -> String {
        let icon = match self.verdict {
            Verdict::Transition => "\u{26a0}\u{fe0f} ",
            Verdict::Recovery => "\u{2705} ",
            Verdict::Reminder => "\u{1f514} ",
            Verdict::None => "",
        };
        format!("{icon}**{}**: {}", self.headline, self.detail)
    }

    pub fn subject(&self) -> String {
        format!("{SUBJECT_PREFIX} {}", self.headline)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(serial: Option<&str>) -> DeviceContext {
        DeviceContext {
            id: "WD-1".to_string(),
            device: "/dev/sda".to_string(),
            serial_no: serial.map(str::to_string),
            health_percent: 85,
            threshold: 90,
        }
    }

    #[test]
    fn none_verdict_has_no_message() {
        assert!(AlertMessage::compose(Verdict::None, &ctx(Some("WD-1"))).is_none());
    }

    #[test]
    fn transition_message_names_device_and_threshold() {
        let msg = AlertMessage::compose(Verdict::Transition, &ctx(Some("WD-1"))).unwrap();
        assert_eq!(
            msg.text(),
            "Disk Health Alert: /dev/sda (SN: WD-1) has health 85% (threshold: 90%)"
        );
        assert_eq!(msg.subject(), "[DiskWarden] Disk Health Alert");
        assert!(msg.markdown().contains("**Disk Health Alert**"));
    }

    #[test]
    fn missing_serial_renders_placeholder() {
        let msg = AlertMessage::compose(Verdict::Reminder, &ctx(None)).unwrap();
        assert!(msg.detail.contains("(SN: N/A)"));
        assert!(msg.detail.contains("still at 85%"));
    }

    #[test]
    fn recovery_message_omits_threshold() {
        let msg = AlertMessage::compose(Verdict::Recovery, &ctx(Some("WD-1"))).unwrap();
        assert_eq!(msg.headline, "Disk Recovered");
        assert!(!msg.detail.contains("threshold"));
    }
}
