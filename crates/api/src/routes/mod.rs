pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /status                 device states and scan timing (GET)
/// /disk_health            last reading snapshot (GET)
/// /devices/{id}           stored record of one device (GET)
/// /scan_now               run a cycle now (POST)
/// /settings               get, replace (GET, PUT)
/// /test_message           send a test webhook message (POST)
/// /test_email             send a test email (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status::get_status))
        .route("/disk_health", get(handlers::status::get_disk_health))
        .route("/devices/{id}", get(handlers::status::get_device))
        .route("/scan_now", post(handlers::scan::scan_now))
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route("/test_message", post(handlers::notify_test::test_message))
        .route("/test_email", post(handlers::notify_test::test_email))
}
