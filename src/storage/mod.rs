//! Durable backing store for the monitor actor
//!
//! The actor persists two named records (`last` and `history`) on every
//! committed sample and reads them once at startup.
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database file, survives restarts
//! - **In-Memory**: No persistence, for tests or throwaway deployments
//!
//! ## Usage
//!
//! ```no_run
//! use live_monitor::storage::{StateStore, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteStore::new("./monitor.db").await?;
//!     // Hand to MonitorHandle::spawn
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StateStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::{RecordKey, SCHEMA_VERSION, StoredRecord};
