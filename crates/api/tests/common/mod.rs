#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use diskwarden_core::alert::{AlertMessage, ChannelTargets, DeviceContext};
use diskwarden_core::health::Verdict;
use diskwarden_core::ports::{DiskReadingSource, NotificationSink, SourceError};
use diskwarden_core::reading::DiskReading;
use diskwarden_core::settings::MonitorSettings;
use diskwarden_db::SqliteStateStore;
use diskwarden_events::{ChannelNotifier, WebhookDelivery};
use diskwarden_scanner::ScanOrchestrator;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use diskwarden_api::config::ServerConfig;
use diskwarden_api::routes;
use diskwarden_api::settings::SettingsHandle;
use diskwarden_api::state::AppState;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Serves queued snapshots in order; an empty queue means "source down".
#[derive(Default)]
pub struct QueuedSource {
    snapshots: Mutex<VecDeque<Vec<DiskReading>>>,
}

impl QueuedSource {
    pub fn push(&self, readings: Vec<DiskReading>) {
        self.snapshots.lock().unwrap().push_back(readings);
    }
}

#[async_trait]
impl DiskReadingSource for QueuedSource {
    async fn read(&self) -> Result<Vec<DiskReading>, SourceError> {
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SourceError::Unavailable("reader offline".to_string()))
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    pub verdicts: Mutex<Vec<Verdict>>,
}

#[async_trait]
impl NotificationSink for CountingNotifier {
    async fn send(
        &self,
        verdict: Verdict,
        _device: &DeviceContext,
        _message: &AlertMessage,
        _targets: &ChannelTargets,
    ) -> bool {
        self.verdicts.lock().unwrap().push(verdict);
        true
    }
}

pub fn reading(device: &str, serial: &str, health: i64) -> DiskReading {
    DiskReading {
        device: device.to_string(),
        serial_no: Some(serial.to_string()),
        health_percent: health,
        model_id: None,
        temp: Some(35),
        highest_temp: None,
        performance: None,
        power_on_hours: None,
        lifetime_days: None,
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: Vec::new(),
        request_timeout_secs: 30,
        database_url: format!("sqlite://{}", dir.path().join("state.db").display()),
        settings_path: dir.path().join("settings.json"),
        scanner_enabled: false,
        reader_command: "diskwarden-reader".to_string(),
        reader_timeout_secs: 5,
        lock_timeout_ms: 200,
    }
}

pub struct TestApp {
    pub app: Router,
    pub source: Arc<QueuedSource>,
    pub notifier: Arc<CountingNotifier>,
    pub settings: SettingsHandle,
    /// Keeps the database and settings file alive.
    pub dir: TempDir,
}

/// Build the full application router with all middleware layers on a fresh
/// SQLite database.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub async fn build_test_app(settings: MonitorSettings) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let pool = diskwarden_db::create_pool(&config.database_url).await.unwrap();
    diskwarden_db::run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteStateStore::new(pool.clone()).with_lock_timeout(config.lock_timeout()));

    let source = Arc::new(QueuedSource::default());
    let notifier = Arc::new(CountingNotifier::default());
    let orchestrator = Arc::new(ScanOrchestrator::new(
        store,
        source.clone(),
        notifier.clone(),
    ));

    let settings_handle = SettingsHandle::load(config.settings_path.clone()).await;
    settings_handle.replace(settings).await.unwrap();

    let webhook = WebhookDelivery::new()
        .unwrap()
        .with_retry_delays(Vec::new());

    let state = AppState {
        pool,
        config: Arc::new(config),
        settings: settings_handle.clone(),
        orchestrator,
        notifier: Arc::new(ChannelNotifier::new(webhook, None)),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state);

    TestApp {
        app,
        source,
        notifier,
        settings: settings_handle,
        dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    send_json(app, Method::POST, uri, serde_json::json!({})).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
