//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to the monitor via mpsc
//! 2. **Replies**: oneshot channels answered from inside the actor task
//! 3. **Stream events**: what a subscription yields to its transport

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::subscribers::Subscription;
use crate::Sample;
use crate::storage::{HealthStatus, StorageResult};

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Latest sample, fetched first if it is older than one poll interval
    GetStats {
        respond_to: oneshot::Sender<Sample>,
    },

    /// Rolling history plus latest, after ensuring one fresh-or-cached sample
    GetHistory {
        respond_to: oneshot::Sender<HistorySnapshot>,
    },

    /// Force an upstream fetch regardless of staleness
    ///
    /// Coalesces with a fetch that is already in flight.
    Refresh {
        respond_to: oneshot::Sender<Sample>,
    },

    /// Open a streaming subscription
    Subscribe {
        respond_to: oneshot::Sender<Subscription>,
    },

    /// Remove a subscriber (idempotent)
    Unsubscribe { id: SubscriberId },

    /// Internal counters, for health checks and tests
    GetDiagnostics {
        respond_to: oneshot::Sender<MonitorDiagnostics>,
    },

    /// Ping the storage backend
    StorageHealth {
        respond_to: oneshot::Sender<StorageResult<HealthStatus>>,
    },

    /// Gracefully shut down the monitor
    ///
    /// Open subscriptions end and the storage backend is closed.
    Shutdown,
}

/// Identifier of a live subscriber, unique for the lifetime of one actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Immutable view of the rolling history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub poll_interval_ms: u64,
    pub history_minutes: u64,
    pub history: Vec<Sample>,
    pub latest: Sample,
}

/// Item yielded by a [`Subscription`]
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A new sample (or the current latest, right after subscribing)
    Sample(Sample),

    /// Keep-alive with no payload
    Heartbeat,
}

/// Monitor counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorDiagnostics {
    /// Live subscribers
    pub subscribers: usize,

    /// Samples currently in the rolling history
    pub history_len: usize,

    /// Maximum samples in the rolling history
    pub window_capacity: usize,

    /// An upstream fetch is outstanding
    pub fetching: bool,

    /// The recurring poll timer is armed or a tick is being served
    pub schedule_active: bool,

    /// Upstream fetches started since the actor was spawned
    pub upstream_fetches: u64,

    /// Write-through attempts that failed
    pub persist_failures: u64,
}
