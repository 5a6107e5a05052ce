use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use diskwarden_core::ports::MetricsSink;
use diskwarden_core::store::StateStore;
use diskwarden_db::SqliteStateStore;
use diskwarden_events::{ChannelNotifier, EmailConfig, EmailDelivery, InfluxConfig, InfluxWriter, WebhookDelivery};
use diskwarden_scanner::{CommandSource, ScanOrchestrator};
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diskwarden_api::config::ServerConfig;
use diskwarden_api::settings::SettingsHandle;
use diskwarden_api::state::AppState;
use diskwarden_api::{background, routes};

/// How long shutdown waits for each background job.
const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "diskwarden_api=info,diskwarden_scanner=info,diskwarden_db=info,diskwarden_events=info,tower_http=info"
                    .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        scanner_enabled = config.scanner_enabled,
        "Loaded server configuration"
    );

    // --- Database ---
    let pool = diskwarden_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open state database");
    tracing::info!(url = %config.database_url, "Database connection pool created");

    diskwarden_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    diskwarden_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn StateStore> =
        Arc::new(SqliteStateStore::new(pool.clone()).with_lock_timeout(config.lock_timeout()));

    // --- Settings ---
    let settings = SettingsHandle::load(config.settings_path.clone()).await;

    // --- Collaborators ---
    let source = CommandSource::from_command_line(&config.reader_command, config.reader_timeout())
        .expect("DISK_READER_CMD must not be empty");

    let email = EmailConfig::from_env().map(EmailDelivery::new);
    let webhook = WebhookDelivery::new().expect("Failed to build HTTP client");
    let notifier = Arc::new(ChannelNotifier::new(webhook, email));
    if !notifier.email_configured() {
        tracing::info!("SMTP_HOST not set, email channel disabled");
    }

    let mut orchestrator = ScanOrchestrator::new(store.clone(), Arc::new(source), notifier.clone());
    match InfluxConfig::from_env().map(InfluxWriter::new) {
        Some(Ok(writer)) => {
            tracing::info!("InfluxDB metrics sink enabled");
            let sink: Arc<dyn MetricsSink> = Arc::new(writer);
            orchestrator = orchestrator.with_metrics(sink);
        }
        Some(Err(e)) => tracing::error!(error = %e, "Failed to build metrics sink, metrics disabled"),
        None => tracing::debug!("INFLUX_URL not set, metrics disabled"),
    }
    let orchestrator = Arc::new(orchestrator);

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let mut jobs = Vec::new();

    jobs.push(tokio::spawn(background::state_retention::run(
        store.clone(),
        settings.clone(),
        cancel.clone(),
    )));

    if config.scanner_enabled {
        jobs.push(tokio::spawn(background::scan_scheduler::run(
            Arc::clone(&orchestrator),
            settings.clone(),
            cancel.clone(),
        )));
    } else {
        tracing::info!("Periodic scanner disabled (set DISKWARDEN_SCANNER=1 to enable)");
    }

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        settings,
        orchestrator,
        notifier,
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api).
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(build_cors_layer(&config))
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let stopped = futures::future::join_all(
        jobs.into_iter()
            .map(|handle| tokio::time::timeout(JOB_SHUTDOWN_TIMEOUT, handle)),
    )
    .await;
    let abandoned = stopped.iter().filter(|r| r.is_err()).count();
    if abandoned > 0 {
        tracing::warn!(abandoned, "Background jobs did not stop in time");
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a service manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
