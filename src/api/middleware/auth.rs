//! Access key middleware
//!
//! Dashboards embed the key in the page URL, so besides the usual bearer
//! header the key is also accepted as the `k` query parameter.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

/// Key every request has to present
#[derive(Debug, Clone)]
pub struct AccessKey(Arc<str>);

impl AccessKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    k: Option<String>,
}

/// Authentication middleware
///
/// Checks the `k` query parameter first, then a Bearer token in the
/// Authorization header.
pub async fn auth_middleware(
    State(expected): State<AccessKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let presented = presented_key(&request).ok_or(AuthError::MissingKey)?;

    if presented != *expected.0 {
        debug!("rejecting request to {} with wrong access key", request.uri().path());
        return Err(AuthError::InvalidKey);
    }

    Ok(next.run(request).await)
}

fn presented_key(request: &Request<Body>) -> Option<String> {
    let from_query = Query::<KeyQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.k)
        .filter(|k| !k.is_empty());

    from_query.or_else(|| {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingKey,
    InvalidKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingKey => (
                StatusCode::UNAUTHORIZED,
                "Missing access key (use ?k=<key> or Authorization: Bearer <key>)",
            ),
            AuthError::InvalidKey => (StatusCode::FORBIDDEN, "Invalid access key"),
        };

        (status, message).into_response()
    }
}
