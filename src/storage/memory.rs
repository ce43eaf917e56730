//! In-memory storage backend (no persistence)
//!
//! Useful for tests and for deployments that accept losing the rolling
//! history on restart (`"backend": "none"`).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StateStore};
use super::error::StorageResult;
use super::schema::{RecordKey, StoredRecord};

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKey, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records, e.g. state left by a previous run.
    pub fn with_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.key, r)).collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: RecordKey) -> StorageResult<Option<StoredRecord>> {
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn put_all(&self, records: Vec<StoredRecord>) -> StorageResult<()> {
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert(record.key, record);
        }
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let count = self.records.read().await.len();
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("records".to_string(), count.to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
