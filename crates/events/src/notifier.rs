//! Multi-channel alert delivery.
//!
//! [`ChannelNotifier`] sends one alert to the webhook and email targets of
//! the current cycle. The channels run concurrently and fail independently:
//! a webhook outage never suppresses the email, and vice versa.

use async_trait::async_trait;
use diskwarden_core::alert::{AlertMessage, ChannelTargets, DeviceContext};
use diskwarden_core::health::Verdict;
use diskwarden_core::ports::NotificationSink;

use crate::delivery::email::{EmailDelivery, EmailError};
use crate::delivery::webhook::{WebhookDelivery, WebhookError};

pub struct ChannelNotifier {
    webhook: WebhookDelivery,
    /// `None` when SMTP is not configured.
    email: Option<EmailDelivery>,
}

impl ChannelNotifier {
    pub fn new(webhook: WebhookDelivery, email: Option<EmailDelivery>) -> Self {
        Self { webhook, email }
    }

    pub fn email_configured(&self) -> bool {
        self.email.is_some()
    }

    /// Send `message` through the webhook channel only.
    pub async fn send_webhook(&self, url: &str, message: &AlertMessage) -> Result<(), WebhookError> {
        self.webhook.deliver(url, &message.markdown()).await
    }

    /// Send `message` through the email channel only.
    pub async fn send_email(&self, to: &str, message: &AlertMessage) -> Result<(), EmailError> {
        let email = self.email.as_ref().ok_or(EmailError::NotConfigured)?;
        email.deliver(to, &message.subject(), &message.text()).await
    }
}

#[async_trait]
impl NotificationSink for ChannelNotifier {
    async fn send(
        &self,
        verdict: Verdict,
        device: &DeviceContext,
        message: &AlertMessage,
        targets: &ChannelTargets,
    ) -> bool {
        if targets.is_empty() {
            tracing::debug!(disk_id = %device.id, ?verdict, "No notification channels configured");
            return true;
        }

        let webhook = async {
            let Some(url) = targets.webhook_url.as_deref() else {
                return true;
            };
            match self.send_webhook(url, message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(disk_id = %device.id, ?verdict, error = %e, "Webhook alert failed");
                    false
                }
            }
        };

        let email = async {
            let Some(to) = targets.email.as_deref() else {
                return true;
            };
            match self.send_email(to, message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(disk_id = %device.id, ?verdict, error = %e, "Email alert failed");
                    false
                }
            }
        };

        let (webhook_ok, email_ok) = tokio::join!(webhook, email);
        webhook_ok && email_ok
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
