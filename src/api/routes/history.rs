//! Rolling history endpoint

use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/history
///
/// Returns `{ poll_interval_ms, history_minutes, history, latest }`
pub async fn get_history(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let snapshot = state.monitor.history().await?;

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(snapshot)))
}
