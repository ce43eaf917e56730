pub mod health;
pub mod history;
pub mod stats;

use axum::http::Uri;

use crate::api::error::ApiError;

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
