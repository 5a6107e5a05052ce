//! Read-only status endpoints: device states, last snapshot, single record.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use diskwarden_core::error::CoreError;
use diskwarden_core::health::DeviceState;
use diskwarden_core::store::{DeviceRecord, DeviceStatus};
use diskwarden_core::types::{DeviceId, Timestamp};
use diskwarden_scanner::Snapshot;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Start of the last completed cycle.
    pub last_scan: Option<Timestamp>,
    /// `last_scan` plus the configured interval.
    pub next_scan: Option<Timestamp>,
    pub scan_interval_seconds: u64,
    pub disks_below_threshold: usize,
    /// Whether the periodic scanner is enabled.
    pub scanner_running: bool,
    /// Whether a cycle is executing right now.
    pub scan_in_progress: bool,
    pub devices: BTreeMap<DeviceId, DeviceStatus>,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> AppResult<Json<DataResponse<StatusResponse>>> {
    let settings = state.settings.current().await;
    let devices = state.orchestrator.store().all().await;
    let last_scan = state.orchestrator.last_completed();
    let interval = i64::try_from(settings.scan_interval_seconds).unwrap_or(i64::MAX);

    let status = StatusResponse {
        last_scan,
        next_scan: last_scan.and_then(|t| t.checked_add_signed(chrono::Duration::try_seconds(interval)?)),
        scan_interval_seconds: settings.scan_interval_seconds,
        disks_below_threshold: devices
            .values()
            .filter(|d| d.state == DeviceState::BelowThreshold)
            .count(),
        scanner_running: state.config.scanner_enabled,
        scan_in_progress: state.orchestrator.is_running(),
        devices,
    };
    Ok(Json(DataResponse { data: status }))
}

/// GET /disk_health
///
/// The reading snapshot of the last completed cycle.
pub async fn get_disk_health(State(state): State<AppState>) -> AppResult<Json<DataResponse<Snapshot>>> {
    let snapshot = state
        .orchestrator
        .last_snapshot()
        .ok_or_else(|| AppError::ServiceUnavailable("no scan has completed yet".to_string()))?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /devices/{id}
///
/// Ids containing `/` (device paths) must be percent-encoded.
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<DeviceId>,
) -> AppResult<Json<DataResponse<DeviceRecord>>> {
    let record = state
        .orchestrator
        .store()
        .find(&id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Device",
            id,
        })?;
    Ok(Json(DataResponse { data: record }))
}
