//! Persisted record layout
//!
//! The monitor keeps exactly two named records:
//!
//! - `last` - the latest [`Sample`]
//! - `history` - the rolling window as an ordered [`Sample`] array
//!
//! Both are stored as JSON payloads tagged with [`SCHEMA_VERSION`]. A record
//! written by a different version is reported as
//! [`StorageError::SchemaMismatch`] and the caller falls back to defaults.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::error::{StorageError, StorageResult};
use crate::Sample;

/// Version of the JSON payload layout
pub const SCHEMA_VERSION: u32 = 1;

/// Names of the persisted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKey {
    Last,
    History,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Last => "last",
            RecordKey::History => "history",
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named record as it sits in the backend
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: RecordKey,
    pub schema_version: u32,
    /// JSON payload
    pub payload: String,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    fn encode<T: Serialize + ?Sized>(key: RecordKey, value: &T) -> StorageResult<Self> {
        Ok(Self {
            key,
            schema_version: SCHEMA_VERSION,
            payload: serde_json::to_string(value)?,
            updated_at: Utc::now(),
        })
    }

    fn decode<T: DeserializeOwned>(&self) -> StorageResult<T> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(StorageError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: self.schema_version,
            });
        }

        serde_json::from_str(&self.payload).map_err(|e| {
            StorageError::SerializationError(format!("failed to decode {} record: {}", self.key, e))
        })
    }

    pub fn from_latest(latest: &Sample) -> StorageResult<Self> {
        Self::encode(RecordKey::Last, latest)
    }

    pub fn from_history<'a>(history: impl IntoIterator<Item = &'a Sample>) -> StorageResult<Self> {
        let history: Vec<&Sample> = history.into_iter().collect();
        Self::encode(RecordKey::History, &history)
    }

    pub fn to_latest(&self) -> StorageResult<Sample> {
        self.decode()
    }

    pub fn to_history(&self) -> StorageResult<Vec<Sample>> {
        self.decode()
    }
}
