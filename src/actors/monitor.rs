//! MonitorActor - Owns the state of one monitored resource
//!
//! ## Message Flow
//!
//! ```text
//! Commands ──┐
//!            ├──► select! ──► SampleStore / PollCoordinator / SubscriberRegistry
//! Fetch done ┤        │
//! Unsubscribe┤        └──► spawn upstream fetch (at most one in flight)
//! Poll timer ┘
//! ```
//!
//! Everything that touches history, latest or the subscriber set runs inside
//! this task, one message at a time. The upstream call runs in a separate
//! task and reports back over an internal channel, so commands keep being
//! served while it is outstanding.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, trace, warn};

use super::history::SampleStore;
use super::messages::{HistorySnapshot, MonitorCommand, MonitorDiagnostics, SubscriberId};
use super::poll::{PollCoordinator, Waiter};
use super::subscribers::{SubscriberRegistry, Subscription};
use crate::config::MonitorConfig;
use crate::source::StatusSource;
use crate::storage::{HealthStatus, StateStore};
use crate::{Sample, StatusReading, util};

/// Actor that polls one upstream resource and streams its status
pub struct MonitorActor {
    config: MonitorConfig,

    store: SampleStore,

    poll: PollCoordinator,

    subscribers: SubscriberRegistry,

    /// Upstream status source, shared with the fetch task
    source: Arc<dyn StatusSource>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Completed upstream fetches
    fetch_tx: mpsc::Sender<Option<StatusReading>>,
    fetch_rx: mpsc::Receiver<Option<StatusReading>>,

    /// Ids of dropped subscriptions
    unsubscribe_rx: mpsc::UnboundedReceiver<SubscriberId>,

    persist_failures: u64,
}

impl MonitorActor {
    /// Create a new monitor actor around an already loaded store
    pub fn new(
        config: MonitorConfig,
        store: SampleStore,
        source: Arc<dyn StatusSource>,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel(1);
        let (unsubscribe_tx, unsubscribe_rx) = mpsc::unbounded_channel();

        let poll = PollCoordinator::new(config.poll_interval());
        let subscribers = SubscriberRegistry::new(
            config.subscriber_buffer,
            config.heartbeat_interval(),
            unsubscribe_tx,
        );

        Self {
            config,
            store,
            poll,
            subscribers,
            source,
            command_rx,
            fetch_tx,
            fetch_rx,
            unsubscribe_rx,
            persist_failures: 0,
        }
    }

    /// Run the actor's main loop
    ///
    /// This is the entry point for the actor. It runs until:
    /// - A Shutdown command is received
    /// - Every handle has been dropped
    #[instrument(skip(self), fields(poll_ms = self.config.poll_interval_ms))]
    pub async fn run(mut self) {
        debug!(
            "starting monitor actor (window {} samples)",
            self.store.capacity()
        );
        if self.store.is_empty() {
            debug!("no persisted history, starting empty");
        }

        loop {
            let deadline = self.poll.next_tick();

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(outcome) = self.fetch_rx.recv() => {
                    self.complete_fetch(outcome).await;
                }

                Some(id) = self.unsubscribe_rx.recv() => {
                    self.subscribers.remove(id);
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_tick();
                }
            }
        }

        self.subscribers.clear();

        if let Err(e) = self.store.backend().close().await {
            error!("error closing backend: {}", e);
        }

        debug!("monitor actor stopped");
    }

    async fn handle_command(&mut self, cmd: MonitorCommand) {
        match cmd {
            MonitorCommand::GetStats { respond_to } => {
                self.get_fresh(false, Waiter::Sample(respond_to));
            }

            MonitorCommand::GetHistory { respond_to } => {
                self.get_fresh(false, Waiter::History(respond_to));
            }

            MonitorCommand::Refresh { respond_to } => {
                debug!("received Refresh command");
                self.get_fresh(true, Waiter::Sample(respond_to));
            }

            MonitorCommand::Subscribe { respond_to } => {
                let subscription = self.subscribers.register(self.store.latest());
                if self.poll.ensure_schedule() {
                    debug!("poll schedule armed");
                }
                // A caller that went away drops the subscription, which unsubscribes
                let _ = respond_to.send(subscription);
            }

            MonitorCommand::Unsubscribe { id } => {
                self.subscribers.remove(id);
            }

            MonitorCommand::GetDiagnostics { respond_to } => {
                let _ = respond_to.send(self.diagnostics());
            }

            MonitorCommand::StorageHealth { respond_to } => {
                let _ = respond_to.send(self.store.backend().health_check().await);
            }

            MonitorCommand::Shutdown => {}
        }
    }

    /// Serve from latest if it is fresh enough, otherwise attach to (or
    /// start) the single in-flight fetch.
    fn get_fresh(&mut self, force: bool, waiter: Waiter) {
        if !force && self.poll.is_fresh(util::now_millis(), self.store.latest().timestamp) {
            trace!("latest sample is fresh, skipping upstream");
            self.resolve(waiter);
            return;
        }

        self.poll.attach(waiter);
        self.start_fetch();
    }

    fn start_fetch(&mut self) {
        if !self.poll.begin_fetch() {
            trace!("fetch already in flight, coalescing");
            return;
        }

        trace!("starting upstream fetch #{}", self.poll.fetches());

        let source = Arc::clone(&self.source);
        let fetch_tx = self.fetch_tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::spawn(async move { source.fetch_status().await })
                .await
                .unwrap_or_else(|e| {
                    error!("upstream fetch task failed: {e}");
                    None
                });

            // Actor gone when this fails
            let _ = fetch_tx.send(outcome).await;
        });
    }

    /// Turn a fetch outcome into the next sample, record it and answer
    /// everyone who waited on it.
    async fn complete_fetch(&mut self, outcome: Option<StatusReading>) {
        let previous = self.store.latest();
        let timestamp = next_timestamp(util::now_millis(), previous.timestamp);

        let sample = match outcome {
            Some(reading) => reading.at(timestamp),
            None => {
                debug!("upstream returned nothing, carrying previous values forward");
                previous.continued_at(timestamp)
            }
        };

        if let Err(e) = self.store.record(sample.clone()).await {
            self.persist_failures += 1;
            error!(
                "failed to persist sample at {} (kept in memory): {}",
                sample.timestamp, e
            );
        }

        let (waiters, tick) = self.poll.finish_fetch();
        trace!("fetch complete, answering {} waiters", waiters.len());
        for waiter in waiters {
            self.resolve_with(waiter, &sample);
        }

        if tick {
            self.finish_tick(&sample);
        }
    }

    fn on_tick(&mut self) {
        trace!("poll timer fired");
        self.poll.on_tick();
        self.start_fetch();
    }

    /// Broadcast the tick's sample and keep polling only while somebody
    /// is watching.
    fn finish_tick(&mut self, sample: &Sample) {
        self.subscribers.broadcast(sample);
        self.subscribers.prune();

        if self.subscribers.is_empty() {
            info!("no subscribers left, poll schedule lapsed");
        } else {
            self.poll.rearm();
        }
    }

    fn resolve(&self, waiter: Waiter) {
        let latest = self.store.latest().clone();
        self.resolve_with(waiter, &latest);
    }

    fn resolve_with(&self, waiter: Waiter, sample: &Sample) {
        match waiter {
            Waiter::Sample(tx) => {
                let _ = tx.send(sample.clone());
            }
            Waiter::History(tx) => {
                let _ = tx.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> HistorySnapshot {
        self.store
            .snapshot(self.config.poll_interval_ms, self.config.history_minutes)
    }

    fn diagnostics(&self) -> MonitorDiagnostics {
        MonitorDiagnostics {
            subscribers: self.subscribers.len(),
            history_len: self.store.len(),
            window_capacity: self.store.capacity(),
            fetching: self.poll.is_fetching(),
            schedule_active: self.poll.schedule_active(),
            upstream_fetches: self.poll.fetches(),
            persist_failures: self.persist_failures,
        }
    }
}

/// Stamp for the next sample: strictly after `previous`, even if the clock
/// stepped back, and pinned at the maximum instead of overflowing.
fn next_timestamp(now: i64, previous: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

/// Handle for talking to a MonitorActor
///
/// This handle provides a typed API for sending commands to the actor.
/// It can be cloned and shared across tasks; the actor stops once every
/// clone is dropped.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Load persisted state and spawn a new monitor actor
    ///
    /// Unreadable persisted state is treated as "no prior state".
    pub async fn spawn(
        config: MonitorConfig,
        source: Arc<dyn StatusSource>,
        backend: Box<dyn StateStore>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let store = SampleStore::load(backend, config.window_capacity()).await;
        let actor = MonitorActor::new(config, store, source, cmd_rx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Latest sample, refreshed from upstream when stale
    pub async fn latest(&self) -> Result<Sample> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive latest sample")
    }

    /// Rolling history and latest sample
    pub async fn history(&self) -> Result<HistorySnapshot> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetHistory { respond_to: tx })
            .await
            .context("failed to send GetHistory command")?;

        rx.await.context("failed to receive history")
    }

    /// Force an upstream fetch (coalesced with one already in flight)
    pub async fn refresh(&self) -> Result<Sample> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Refresh { respond_to: tx })
            .await
            .context("failed to send Refresh command")?;

        rx.await.context("failed to receive refreshed sample")
    }

    /// Open a streaming subscription
    ///
    /// The first event is the current latest sample. Polling runs while at
    /// least one subscription is open.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Subscribe { respond_to: tx })
            .await
            .context("failed to send Subscribe command")?;

        rx.await.context("failed to receive subscription")
    }

    /// Remove a subscriber; dropping the [`Subscription`] does the same
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<()> {
        self.sender
            .send(MonitorCommand::Unsubscribe { id })
            .await
            .context("failed to send Unsubscribe command")?;
        Ok(())
    }

    pub async fn diagnostics(&self) -> Result<MonitorDiagnostics> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetDiagnostics { respond_to: tx })
            .await
            .context("failed to send GetDiagnostics command")?;

        rx.await.context("failed to receive diagnostics")
    }

    /// Health of the storage backend behind the monitor
    pub async fn storage_health(&self) -> Result<HealthStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::StorageHealth { respond_to: tx })
            .await
            .context("failed to send StorageHealth command")?;

        let health = rx.await.context("failed to receive storage health")?;
        health.context("storage health check failed")
    }

    /// Gracefully shut down the monitor
    ///
    /// Returns once the actor has stopped and closed its storage backend.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;

        // The command receiver is dropped only after the backend is closed
        self.sender.closed().await;
        Ok(())
    }
}
