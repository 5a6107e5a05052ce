use std::sync::Arc;

use diskwarden_events::ChannelNotifier;
use diskwarden_scanner::ScanOrchestrator;

use crate::config::ServerConfig;
use crate::settings::SettingsHandle;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (health checks).
    pub pool: diskwarden_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub settings: SettingsHandle,
    /// Runs scan cycles and owns the state store.
    pub orchestrator: Arc<ScanOrchestrator>,
    /// Channel transports, used directly by the test-notification endpoints.
    pub notifier: Arc<ChannelNotifier>,
}
