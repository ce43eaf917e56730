//! Subscriber registry and per-connection streams
//!
//! Each subscriber gets a bounded mpsc queue. The registry (owned by the
//! monitor actor) keeps the sending halves; the [`Subscription`] handed to
//! the transport owns the receiving half together with its heartbeat timer,
//! so both share one lifetime.
//!
//! ## Lifecycle
//!
//! ```text
//! subscribe ──► register + enqueue latest ──► Subscription (Stream)
//!                                               │
//!         broadcast ──try_send──► queue ───────►│ StreamEvent::Sample
//!         heartbeat interval ─────────────────►│ StreamEvent::Heartbeat
//!                                               │
//! transport drops stream ──► Drop ──► unsubscribe notice ──► registry
//! ```
//!
//! A failed `try_send` (closed or full queue) removes the subscriber in the
//! same pass, so dead connections need no separate cleanup.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Interval, MissedTickBehavior, interval_at};
use tracing::{debug, trace, warn};

use super::messages::{StreamEvent, SubscriberId};
use crate::Sample;

struct Subscriber {
    created_at: DateTime<Utc>,
    sink: mpsc::Sender<Sample>,
}

pub struct SubscriberRegistry {
    next_id: u64,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
    buffer: usize,
    heartbeat: Duration,
    unsubscribe_tx: mpsc::UnboundedSender<SubscriberId>,
}

impl SubscriberRegistry {
    pub fn new(
        buffer: usize,
        heartbeat: Duration,
        unsubscribe_tx: mpsc::UnboundedSender<SubscriberId>,
    ) -> Self {
        Self {
            next_id: 0,
            subscribers: BTreeMap::new(),
            buffer: buffer.max(1),
            heartbeat,
            unsubscribe_tx,
        }
    }

    /// Register a subscriber whose stream starts with `initial`.
    ///
    /// Must be called from within a tokio runtime (the heartbeat timer is
    /// created here).
    pub fn register(&mut self, initial: &Sample) -> Subscription {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let (sink, samples) = mpsc::channel(self.buffer);
        // Capacity is at least one and the queue is fresh
        let _ = sink.try_send(initial.clone());

        let created_at = Utc::now();
        self.subscribers.insert(id, Subscriber { created_at, sink });

        let mut heartbeat = interval_at(tokio::time::Instant::now() + self.heartbeat, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("subscriber {id} registered ({} live)", self.subscribers.len());

        Subscription {
            id,
            samples,
            heartbeat,
            unsubscribe_tx: self.unsubscribe_tx.clone(),
        }
    }

    /// Remove a subscriber. Returns whether it was still registered.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        match self.subscribers.remove(&id) {
            Some(subscriber) => {
                let connected_for = Utc::now() - subscriber.created_at;
                debug!(
                    "subscriber {id} removed after {}s ({} live)",
                    connected_for.num_seconds(),
                    self.subscribers.len()
                );
                true
            }
            None => false,
        }
    }

    /// Push `sample` to every subscriber, dropping those that cannot take
    /// it. Returns the number of deliveries.
    pub fn broadcast(&mut self, sample: &Sample) -> usize {
        let mut delivered = 0;

        self.subscribers
            .retain(|id, subscriber| match subscriber.sink.try_send(sample.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("subscriber {id} disconnected, removing");
                    false
                }
                Err(TrySendError::Full(_)) => {
                    warn!("subscriber {id} is not keeping up, removing");
                    false
                }
            });

        trace!("broadcast sample {} to {delivered} subscribers", sample.timestamp);
        delivered
    }

    /// Drop entries whose stream is already gone.
    pub fn prune(&mut self) {
        self.subscribers.retain(|_, subscriber| !subscriber.sink.is_closed());
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Close every queue; open subscriptions end after draining.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

/// A live subscription
///
/// Yields the latest sample first, then every broadcast sample, with a
/// [`StreamEvent::Heartbeat`] whenever the heartbeat interval elapses. The
/// stream ends when the monitor removes the subscriber or shuts down.
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    samples: mpsc::Receiver<Sample>,
    heartbeat: Interval,
    unsubscribe_tx: mpsc::UnboundedSender<SubscriberId>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Cancel the subscription.
    pub fn cancel(self) {}
}

impl Stream for Subscription {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Poll::Ready(next) = self.samples.poll_recv(cx) {
            return Poll::Ready(next.map(StreamEvent::Sample));
        }

        if self.heartbeat.poll_tick(cx).is_ready() {
            return Poll::Ready(Some(StreamEvent::Heartbeat));
        }

        Poll::Pending
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.samples.close();
        // Monitor already gone when this fails
        let _ = self.unsubscribe_tx.send(self.id);
    }
}
