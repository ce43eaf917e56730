//! Health check endpoint

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{error::ApiResult, state::ApiState};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when storage is unhealthy
    pub status: String,
    pub timestamp: String,
    pub uptime_secs: i64,
    pub storage: StorageHealth,
    pub subscribers: usize,
    pub history_len: usize,
    pub persist_failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageHealth {
    pub healthy: bool,
    pub message: String,
}

/// GET /api/v1/health
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<HealthResponse>> {
    let diagnostics = state.monitor.diagnostics().await?;

    let storage = match state.monitor.storage_health().await {
        Ok(health) => StorageHealth {
            healthy: health.healthy,
            message: health.message,
        },
        Err(e) => {
            warn!("storage health check failed: {e:#}");
            StorageHealth {
                healthy: false,
                message: format!("{e:#}"),
            }
        }
    };

    let now = chrono::Utc::now();
    let status = if storage.healthy { "ok" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        timestamp: now.to_rfc3339(),
        uptime_secs: (now - state.started_at).num_seconds(),
        storage,
        subscribers: diagnostics.subscribers,
        history_len: diagnostics.history_len,
        persist_failures: diagnostics.persist_failures,
    }))
}
