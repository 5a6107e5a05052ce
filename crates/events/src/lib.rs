//! Outbound channels for DiskWarden.
//!
//! - [`delivery`]: webhook (chat) and SMTP email transports.
//! - [`ChannelNotifier`]: the production
//!   [`NotificationSink`](diskwarden_core::ports::NotificationSink), fanning
//!   one alert out to every configured channel.
//! - [`InfluxWriter`]: the production
//!   [`MetricsSink`](diskwarden_core::ports::MetricsSink), writing reading
//!   snapshots to InfluxDB v2 in line protocol.

pub mod delivery;
pub mod metrics;
pub mod notifier;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use metrics::{InfluxConfig, InfluxWriter, MetricsError};
pub use notifier::ChannelNotifier;
