//! Storage backend trait definition
//!
//! This module defines the `StateStore` trait that all storage
//! implementations must implement.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use super::error::StorageResult;
use super::schema::{RecordKey, StoredRecord};

/// Health status of the storage backend
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Durable key/value store for the monitor's named records
///
/// The monitor is the only writer: records are read once at startup and
/// overwritten in full on every committed sample.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are moved into the actor
/// task.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a single record, `None` if it was never written.
    async fn get(&self, key: RecordKey) -> StorageResult<Option<StoredRecord>>;

    /// Overwrite the given records.
    ///
    /// Implementations should apply all records atomically so `last` and
    /// `history` never disagree after a crash.
    async fn put_all(&self, records: Vec<StoredRecord>) -> StorageResult<()>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend is
    /// operational (e.g., ping database).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
