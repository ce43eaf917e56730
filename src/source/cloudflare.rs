//! Cloudflare waiting room status client
//!
//! Polls `GET /zones/{zone}/waiting_rooms/{room}/status` with a bearer token
//! and maps the `result` object onto a [`StatusReading`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, trace, warn};

use crate::StatusReading;
use crate::config::UpstreamConfig;

use super::StatusSource;

/// Fully configured credentials; absent when any piece is missing.
#[derive(Debug, Clone)]
struct Credentials {
    api_token: String,
    zone_id: String,
    waiting_room_id: String,
}

/// Status source backed by the Cloudflare API
pub struct CloudflareSource {
    /// HTTP client (reused across requests)
    client: reqwest::Client,

    base_url: String,

    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    result: Option<WaitingRoomStatus>,
}

#[derive(Debug, Deserialize)]
struct WaitingRoomStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    estimated_total_active_users: Option<u64>,
    #[serde(default)]
    estimated_queued_users: Option<u64>,
    #[serde(default)]
    max_estimated_time_minutes: Option<f64>,
}

impl From<WaitingRoomStatus> for StatusReading {
    fn from(value: WaitingRoomStatus) -> Self {
        Self {
            status: value
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| crate::STATUS_UNKNOWN.to_string()),
            active_count: value.estimated_total_active_users.unwrap_or(0),
            queued_count: value.estimated_queued_users.unwrap_or(0),
            max_wait_minutes: value.max_estimated_time_minutes.unwrap_or(0.0),
        }
    }
}

impl CloudflareSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let credentials = match (&config.api_token, &config.zone_id, &config.waiting_room_id) {
            (Some(api_token), Some(zone_id), Some(waiting_room_id)) => Some(Credentials {
                api_token: api_token.clone(),
                zone_id: zone_id.clone(),
                waiting_room_id: waiting_room_id.clone(),
            }),
            _ => {
                warn!("upstream credentials incomplete, reporting missing_env");
                None
            }
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn status_url(&self, credentials: &Credentials) -> String {
        format!(
            "{}/zones/{}/waiting_rooms/{}/status",
            self.base_url, credentials.zone_id, credentials.waiting_room_id
        )
    }

    async fn request_status(&self, credentials: &Credentials) -> Result<Option<StatusReading>> {
        let url = self.status_url(credentials);

        trace!("requesting waiting room status from {url}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&credentials.api_token)
            .send()
            .await
            .context("failed to send HTTP request")?;

        let http_status = response.status();

        let body = response
            .text()
            .await
            .context("failed to read response body")?;

        let envelope: StatusEnvelope = serde_json::from_str(&body)
            .with_context(|| format!("failed to parse status JSON (HTTP {http_status})"))?;

        Ok(envelope.result.map(StatusReading::from))
    }
}

#[async_trait]
impl StatusSource for CloudflareSource {
    #[instrument(skip(self))]
    async fn fetch_status(&self) -> Option<StatusReading> {
        let Some(credentials) = &self.credentials else {
            return Some(StatusReading::missing_env());
        };

        match self.request_status(credentials).await {
            Ok(Some(reading)) => {
                trace!("upstream status: {}", reading.status);
                Some(reading)
            }
            Ok(None) => {
                warn!("upstream response contained no result");
                None
            }
            Err(e) => {
                warn!("failed to fetch upstream status: {:#}", e);
                None
            }
        }
    }
}
