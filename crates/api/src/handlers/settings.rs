use axum::extract::State;
use axum::Json;
use diskwarden_core::settings::MonitorSettings;
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /settings
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<DataResponse<MonitorSettings>>> {
    Ok(Json(DataResponse {
        data: state.settings.current().await,
    }))
}

/// PUT /settings
///
/// Partial update: fields in the body overwrite the current values, omitted
/// fields are kept. The scheduler picks up a new interval after its current
/// wait.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(patch): Json<Map<String, Value>>,
) -> AppResult<Json<DataResponse<MonitorSettings>>> {
    let saved = state.settings.merge(patch).await?;
    Ok(Json(DataResponse { data: saved }))
}
