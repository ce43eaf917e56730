//! Actor-based live status monitor
//!
//! A single monitor actor owns all mutable state for one upstream resource
//! and runs as an independent async task. Everything else talks to it through
//! a cloneable [`MonitorHandle`](monitor::MonitorHandle).
//!
//! ## Architecture Overview
//!
//! ```text
//!   HTTP handlers / SSE streams
//!              │ MonitorHandle (mpsc commands, oneshot replies)
//!              ▼
//!     ┌─────────────────┐   spawn    ┌──────────────────┐
//!     │  MonitorActor   │──────────►│  upstream fetch  │
//!     │                 │◄──────────│  (StatusSource)  │
//!     │  SampleStore    │  outcome   └──────────────────┘
//!     │  PollCoordinator│
//!     │  Subscribers    │──write-through──► StateStore
//!     └────────┬────────┘
//!              │ try_send per subscriber
//!              ▼
//!        Subscription streams (own heartbeat timer)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the handle sends control messages over an mpsc channel
//! 2. **Request/Response**: oneshot channels, answered once a fresh or
//!    cached sample is available
//! 3. **Fan-out**: one bounded queue per subscriber; a reader that falls
//!    behind is removed

pub mod history;
pub mod messages;
pub mod monitor;
pub mod poll;
pub mod subscribers;

pub use messages::{HistorySnapshot, MonitorDiagnostics, StreamEvent, SubscriberId};
pub use monitor::MonitorHandle;
pub use subscribers::Subscription;
