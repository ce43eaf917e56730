//! Rolling sample history with write-through persistence
//!
//! The store keeps at most `capacity` samples (oldest evicted first) plus the
//! latest sample. Every `record` overwrites both persisted records before it
//! returns. If the write fails the in-memory state is kept; the next
//! successful write repairs the persisted copy.

use std::collections::VecDeque;

use tracing::{debug, instrument, trace, warn};

use super::messages::HistorySnapshot;
use crate::{Sample, util};
use crate::storage::{RecordKey, StateStore, StorageResult, StoredRecord};

/// Persisted samples stamped further than this ahead of the clock are
/// treated as absent.
const MAX_FUTURE_SKEW_MS: i64 = 24 * 60 * 60 * 1000;

pub struct SampleStore {
    history: VecDeque<Sample>,
    latest: Sample,
    capacity: usize,
    backend: Box<dyn StateStore>,
}

impl SampleStore {
    /// Load persisted state, falling back to empty history and a placeholder
    /// latest for any record that is missing or unreadable.
    ///
    /// A history longer than `capacity` (the window shrank across a restart)
    /// is truncated to its most recent entries.
    #[instrument(skip(backend))]
    pub async fn load(backend: Box<dyn StateStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);

        let history = match backend.get(RecordKey::History).await {
            Ok(Some(record)) => record.to_history().unwrap_or_else(|e| {
                warn!("discarding persisted history: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("failed to read persisted history: {e}");
                Vec::new()
            }
        };

        let latest = match backend.get(RecordKey::Last).await {
            Ok(Some(record)) => record.to_latest().unwrap_or_else(|e| {
                warn!("discarding persisted latest sample: {e}");
                Sample::placeholder()
            }),
            Ok(None) => Sample::placeholder(),
            Err(e) => {
                warn!("failed to read persisted latest sample: {e}");
                Sample::placeholder()
            }
        };

        let horizon = util::now_millis().saturating_add(MAX_FUTURE_SKEW_MS);
        let latest = if latest.timestamp > horizon {
            warn!("discarding persisted latest sample from the future ({})", latest.timestamp);
            Sample::placeholder()
        } else {
            latest
        };

        let history = ordered_tail(history, capacity, horizon);

        debug!(
            "loaded {} samples (capacity {}), latest at {}",
            history.len(),
            capacity,
            latest.timestamp
        );

        Self {
            history,
            latest,
            capacity,
            backend,
        }
    }

    /// Record a sample and persist the result.
    ///
    /// The sample is appended only if its timestamp differs from the last
    /// stored entry; `latest` is replaced unconditionally.
    pub async fn record(&mut self, sample: Sample) -> StorageResult<()> {
        self.apply(sample);
        self.persist().await
    }

    fn apply(&mut self, sample: Sample) {
        let duplicate = self
            .history
            .back()
            .is_some_and(|last| last.timestamp == sample.timestamp);

        if duplicate {
            trace!("sample at {} already in history", sample.timestamp);
        } else {
            self.history.push_back(sample.clone());
            while self.history.len() > self.capacity {
                self.history.pop_front();
            }
        }

        self.latest = sample;
    }

    async fn persist(&self) -> StorageResult<()> {
        let records = vec![
            StoredRecord::from_latest(&self.latest)?,
            StoredRecord::from_history(&self.history)?,
        ];
        self.backend.put_all(records).await
    }

    pub fn latest(&self) -> &Sample {
        &self.latest
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn history(&self) -> impl Iterator<Item = &Sample> {
        self.history.iter()
    }

    pub fn snapshot(&self, poll_interval_ms: u64, history_minutes: u64) -> HistorySnapshot {
        HistorySnapshot {
            poll_interval_ms,
            history_minutes,
            history: self.history.iter().cloned().collect(),
            latest: self.latest.clone(),
        }
    }

    pub fn backend(&self) -> &dyn StateStore {
        self.backend.as_ref()
    }
}

/// Keep the entries that respect timestamp ordering and are not stamped
/// after `horizon`, then the newest `capacity` of them.
fn ordered_tail(samples: Vec<Sample>, capacity: usize, horizon: i64) -> VecDeque<Sample> {
    let mut ordered: VecDeque<Sample> = VecDeque::with_capacity(samples.len().min(capacity));

    for sample in samples {
        if sample.timestamp > horizon {
            warn!("dropping persisted sample from the future ({})", sample.timestamp);
            continue;
        }

        match ordered.back() {
            Some(last) if sample.timestamp <= last.timestamp => {
                warn!(
                    "dropping out-of-order persisted sample at {} (after {})",
                    sample.timestamp, last.timestamp
                );
            }
            _ => ordered.push_back(sample),
        }
    }

    while ordered.len() > capacity {
        ordered.pop_front();
    }

    ordered
}
