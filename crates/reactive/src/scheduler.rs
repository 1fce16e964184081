//! Time sources for operators that expire or buffer.
//!
//! Operators never read a global clock. They ask their injected
//! [`Scheduler`] for the current time and schedule delayed work on it, so
//! tests can drive time deterministically with [`VirtualScheduler`].

use crate::subscription::Subscription;
use parking_lot::Mutex;
use ripple_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;

/// Delayed unit of work.
pub type Task = Box<dyn FnOnce() + Send>;

/// A clock plus a way to run work later.
pub trait Scheduler: Send + Sync {
    /// Time elapsed since the scheduler's epoch.
    fn now(&self) -> Duration;

    /// Runs `task` once `delay` has elapsed.
    ///
    /// Disposing the returned subscription cancels the task if it has not
    /// run yet.
    fn schedule(&self, delay: Duration, task: Task) -> Result<Subscription>;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn schedule(&self, delay: Duration, task: Task) -> Result<Subscription> {
        (**self).schedule(delay, task)
    }
}

#[derive(Default)]
struct VirtualClock {
    now: Duration,
    next_seq: u64,
    /// Pending tasks by due time, ties broken by scheduling order
    queue: BTreeMap<(Duration, u64), Task>,
    shut_down: bool,
}

/// A scheduler whose clock only moves when told to.
///
/// Tasks run on the thread that advances the clock, in due-time order.
#[derive(Clone, Default)]
pub struct VirtualScheduler {
    clock: Arc<Mutex<VirtualClock>>,
}

impl VirtualScheduler {
    /// Creates a scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.clock.lock().queue.len()
    }

    /// Moves the clock forward by `delta`, running every task that falls due.
    pub fn advance_by(&self, delta: Duration) {
        let target = self.clock.lock().now.saturating_add(delta);
        self.advance_to(target);
    }

    /// Moves the clock to `target`, running every task due at or before it.
    ///
    /// The clock never moves backwards. Tasks scheduled by a running task
    /// also run if they fall due before `target`.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let task = {
                let mut clock = self.clock.lock();
                let due = clock
                    .queue
                    .first_key_value()
                    .map(|(&(at, _), _)| at)
                    .filter(|at| *at <= target);
                match due {
                    Some(at) => {
                        clock.now = clock.now.max(at);
                        clock.queue.pop_first().map(|(_, task)| task)
                    }
                    None => {
                        clock.now = clock.now.max(target);
                        None
                    }
                }
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Refuses every later call to `schedule`. Pending tasks are dropped.
    pub fn shutdown(&self) {
        let dropped = {
            let mut clock = self.clock.lock();
            clock.shut_down = true;
            std::mem::take(&mut clock.queue)
        };
        drop(dropped);
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        self.clock.lock().now
    }

    fn schedule(&self, delay: Duration, task: Task) -> Result<Subscription> {
        let slot = {
            let mut clock = self.clock.lock();
            if clock.shut_down {
                return Err(Error::scheduler("virtual scheduler is shut down"));
            }
            let slot = (clock.now.saturating_add(delay), clock.next_seq);
            clock.next_seq += 1;
            clock.queue.insert(slot, task);
            slot
        };

        let clock: Weak<Mutex<VirtualClock>> = Arc::downgrade(&self.clock);
        Ok(Subscription::new(move || {
            if let Some(clock) = clock.upgrade() {
                let cancelled = clock.lock().queue.remove(&slot);
                drop(cancelled);
            }
        }))
    }
}

/// A scheduler backed by a tokio runtime.
///
/// Each task runs on the runtime after a `tokio::time::sleep`; cancelling
/// aborts the spawned task. The clock follows `tokio::time::Instant`, so a
/// paused test runtime controls it too.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
    epoch: Instant,
}

impl TokioScheduler {
    /// Creates a scheduler on the runtime of the calling context.
    ///
    /// Fails with [`Error::Scheduler`] outside a tokio runtime.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::scheduler(e.to_string()))?;
        Ok(Self::from_handle(handle))
    }

    /// Creates a scheduler on the given runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            epoch: Instant::now(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn schedule(&self, delay: Duration, task: Task) -> Result<Subscription> {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Ok(Subscription::new(move || join.abort()))
    }
}
