//! Upstream status sources
//!
//! The monitor actor treats the upstream as an opaque async operation that
//! either yields a [`StatusReading`] or nothing. Implementations must not
//! fail loudly: every network, auth or decoding problem is reported as
//! `None` so the actor can carry the previous values forward.

pub mod cloudflare;

use async_trait::async_trait;

use crate::StatusReading;

pub use cloudflare::CloudflareSource;

/// Something the monitor can poll for the current status
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status.
    ///
    /// Returns `None` on any failure. Latency is unbounded apart from what
    /// the transport imposes.
    async fn fetch_status(&self) -> Option<StatusReading>;
}
