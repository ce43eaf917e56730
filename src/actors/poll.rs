//! Single-flight fetch state and the recurring poll schedule
//!
//! The coordinator holds no I/O. The monitor actor asks it what to do and
//! it answers with plain decisions:
//!
//! ```text
//!   request ──► fresh enough? ──yes──► answer with latest
//!                   │ no
//!                   ▼
//!              attach waiter ──► already fetching? ──yes──► wait for it
//!                                     │ no
//!                                     ▼
//!                               start fetch (Idle → Fetching)
//!
//!   fetch done ──► take waiters, back to Idle
//! ```

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use super::messages::HistorySnapshot;
use crate::Sample;

/// Delay used to arm the schedule "as soon as possible"
pub const IMMEDIATE: Duration = Duration::from_millis(1);

/// A caller attached to the in-flight fetch
#[derive(Debug)]
pub enum Waiter {
    Sample(oneshot::Sender<Sample>),
    History(oneshot::Sender<HistorySnapshot>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
}

#[derive(Debug)]
pub struct PollCoordinator {
    poll_interval: Duration,
    state: FetchState,
    waiters: Vec<Waiter>,
    /// Deadline of the armed poll timer
    next_tick: Option<Instant>,
    /// A tick fired and waits for the in-flight fetch to broadcast
    tick_pending: bool,
    fetches: u64,
}

impl PollCoordinator {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            state: FetchState::Idle,
            waiters: Vec::new(),
            next_tick: None,
            tick_pending: false,
            fetches: 0,
        }
    }

    /// Whether a sample taken at `latest_ts` can be served at `now` without
    /// asking upstream.
    pub fn is_fresh(&self, now: i64, latest_ts: i64) -> bool {
        let age = now.saturating_sub(latest_ts);
        age < self.poll_interval.as_millis() as i64
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn is_fetching(&self) -> bool {
        self.state == FetchState::Fetching
    }

    pub fn attach(&mut self, waiter: Waiter) {
        self.waiters.push(waiter);
    }

    /// Transition to `Fetching`.
    ///
    /// Returns `false` if a fetch is already outstanding, in which case the
    /// caller must not start another one.
    pub fn begin_fetch(&mut self) -> bool {
        if self.is_fetching() {
            return false;
        }
        self.state = FetchState::Fetching;
        self.fetches += 1;
        true
    }

    /// Back to `Idle`, handing over everyone who waited on the fetch and
    /// whether a tick is owed a broadcast.
    pub fn finish_fetch(&mut self) -> (Vec<Waiter>, bool) {
        self.state = FetchState::Idle;
        let waiters = std::mem::take(&mut self.waiters);
        let tick = std::mem::replace(&mut self.tick_pending, false);
        (waiters, tick)
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Timer armed, or a tick is being served.
    pub fn schedule_active(&self) -> bool {
        self.next_tick.is_some() || self.tick_pending
    }

    /// Arm the timer for "as soon as possible" unless the schedule is
    /// already running. Returns `true` if it armed.
    pub fn ensure_schedule(&mut self) -> bool {
        if self.schedule_active() {
            return false;
        }
        self.next_tick = Some(Instant::now() + IMMEDIATE);
        true
    }

    /// Arm the timer one poll interval from now.
    pub fn rearm(&mut self) {
        self.next_tick = Some(Instant::now() + self.poll_interval);
    }

    /// The armed timer fired: disarm it and owe a broadcast once the forced
    /// fetch completes.
    pub fn on_tick(&mut self) {
        self.next_tick = None;
        self.tick_pending = true;
    }
}
