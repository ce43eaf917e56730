//! Latest sample endpoint

use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/stats
///
/// Returns the latest sample, refreshed from upstream first when it is older
/// than one poll interval.
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let sample = state.monitor.latest().await?;

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(sample)))
}
