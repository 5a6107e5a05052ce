use axum::extract::State;
use axum::Json;
use diskwarden_scanner::CycleOutcome;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /scan_now
///
/// Runs a cycle through the same entry point as the scheduler. A cycle that
/// is already running makes this a no-op reported as `skipped`. The cycle
/// runs on its own task and completes even if the request is dropped.
pub async fn scan_now(State(state): State<AppState>) -> AppResult<Json<DataResponse<CycleOutcome>>> {
    let settings = state.settings.current().await;
    tracing::info!("Manual scan requested");
    let outcome = state
        .orchestrator
        .spawn_cycle(settings)
        .await
        .map_err(|e| AppError::InternalError(format!("scan task failed: {e}")))?;
    Ok(Json(DataResponse { data: outcome }))
}
