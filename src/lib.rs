pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod source;
pub mod storage;
pub mod util;

use serde::{Deserialize, Serialize};

/// Status label used before the first successful fetch.
pub const STATUS_UNKNOWN: &str = "unknown";

/// Status label reported when the upstream credentials are not configured.
pub const STATUS_MISSING_ENV: &str = "missing_env";

/// A single observation of the monitored resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Opaque status label (`queueing`, `unknown`, `missing_env`, ...)
    pub status: String,

    pub active_count: u64,

    pub queued_count: u64,

    pub max_wait_minutes: f64,
}

impl Sample {
    /// Stand-in for `latest` before anything has been fetched.
    pub fn placeholder() -> Self {
        Self {
            timestamp: 0,
            status: STATUS_UNKNOWN.to_string(),
            active_count: 0,
            queued_count: 0,
            max_wait_minutes: 0.0,
        }
    }

    /// Copy of this sample carrying a new timestamp.
    ///
    /// Used when the upstream fails so the history keeps one point per tick.
    pub fn continued_at(&self, timestamp: i64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// The status/count part of the sample, without its timestamp.
    pub fn reading(&self) -> StatusReading {
        StatusReading {
            status: self.status.clone(),
            active_count: self.active_count,
            queued_count: self.queued_count,
            max_wait_minutes: self.max_wait_minutes,
        }
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// What an upstream status source reports, before it is stamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReading {
    pub status: String,
    pub active_count: u64,
    pub queued_count: u64,
    pub max_wait_minutes: f64,
}

impl StatusReading {
    /// Sentinel returned when the upstream credentials are absent.
    pub fn missing_env() -> Self {
        Self {
            status: STATUS_MISSING_ENV.to_string(),
            active_count: 0,
            queued_count: 0,
            max_wait_minutes: 0.0,
        }
    }

    pub fn at(self, timestamp: i64) -> Sample {
        Sample {
            timestamp,
            status: self.status,
            active_count: self.active_count,
            queued_count: self.queued_count,
            max_wait_minutes: self.max_wait_minutes,
        }
    }
}
