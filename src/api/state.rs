//! API shared state containing the monitor handle

use chrono::{DateTime, Utc};

use crate::actors::MonitorHandle;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Handle to the monitor actor
    pub monitor: MonitorHandle,

    /// When the server was started, reported by the health check
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(monitor: MonitorHandle) -> Self {
        Self {
            monitor,
            started_at: Utc::now(),
        }
    }
}
