//! Bounded, time-expiring ingestion.
//!
//! Batches of items are appended to a materialized list. The list is capped
//! by size (oldest evicted first) and, optionally, by age: items with a
//! time-to-live are grouped by their rounded expiry time and each group is
//! evicted by one timer.

use crate::gate::Gate;
use crate::observable::{Map, Observable, ObservableExt};
use crate::observer::{Observer, Sink};
use crate::scheduler::Scheduler;
use crate::subscription::{Subscription, SubscriptionSlot};
use hashbrown::HashMap;
use ripple_core::{ChangeReason, ChangeSet, Error};
use ripple_incremental::{expiry_at, BoundedList, ExpiryIndex, ItemId};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

type ExpireAfter<T> = Arc<dyn Fn(&T) -> Option<Duration> + Send + Sync>;

/// Options for [`ToObservableChangeSet`].
pub struct IngestOptions<T> {
    scheduler: Arc<dyn Scheduler>,
    limit: usize,
    expire_after: Option<ExpireAfter<T>>,
}

impl<T> Clone for IngestOptions<T> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            limit: self.limit,
            expire_after: self.expire_after.clone(),
        }
    }
}

impl<T> fmt::Debug for IngestOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestOptions")
            .field("limit", &self.limit)
            .field("expires", &self.expire_after.is_some())
            .finish()
    }
}

impl<T> IngestOptions<T> {
    /// Unlimited, non-expiring ingestion timed by `scheduler`.
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            limit: 0,
            expire_after: None,
        }
    }

    /// Keeps at most `limit` items, evicting the oldest first. 0 means unlimited.
    pub fn limit_size_to(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Gives each item the time-to-live `ttl` returns; `None` never expires.
    pub fn expire_after<F>(mut self, ttl: F) -> Self
    where
        F: Fn(&T) -> Option<Duration> + Send + Sync + 'static,
    {
        self.expire_after = Some(Arc::new(ttl));
        self
    }

    /// Returns the size limit (0 = unlimited).
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Turns a stream of batches into the change sets of a bounded list.
///
/// Each batch produces one change set: an Add per item (with its index) and
/// a Remove per item evicted by the size limit. Expired groups produce their
/// own change sets when their timer fires. Items are keyed by the
/// [`ItemId`] assigned on arrival.
pub struct ToObservableChangeSet<S, T> {
    source: S,
    options: IngestOptions<T>,
}

impl<S, T> ToObservableChangeSet<S, T> {
    /// Ingests the batches of `source`.
    pub fn new(source: S, options: IngestOptions<T>) -> Self {
        Self { source, options }
    }
}

impl<S, T> ToObservableChangeSet<Map<S, fn(T) -> Vec<T>, T>, T>
where
    S: Observable<T>,
    T: 'static,
{
    /// Ingests the values of `source`, each as a batch of one.
    pub fn from_items(source: S, options: IngestOptions<T>) -> Self {
        let batch_of_one: fn(T) -> Vec<T> = |item| vec![item];
        Self::new(source.map(batch_of_one), options)
    }
}

struct IngestState<T> {
    list: BoundedList<T>,
    expiry: ExpiryIndex,
    /// Pending expiry timers by group time
    timers: HashMap<Duration, Subscription>,
}

impl<T> IngestState<T> {
    /// Drops all bookkeeping, returning the timers to cancel.
    fn take_timers(&mut self) -> Vec<Subscription> {
        self.expiry.clear();
        self.timers.drain().map(|(_, timer)| timer).collect()
    }
}

struct IngestCore<T> {
    gate: Gate<IngestState<T>>,
    sink: Sink<ChangeSet<T, ItemId>>,
    options: IngestOptions<T>,
    upstream: SubscriptionSlot,
}

impl<T> IngestCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_batch(self: &Arc<Self>, batch: Vec<T>) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }
        let now = self.options.scheduler.now();
        let expire_after = self.options.expire_after.as_deref();

        let (changes, new_groups, cancelled) = guard.with(|state| {
            let changes = state.list.append(batch);
            let mut new_groups: Vec<Duration> = Vec::new();
            let mut cancelled = Vec::new();

            for change in &changes {
                match change.reason {
                    ChangeReason::Add => {
                        let ttl = expire_after.and_then(|ttl| ttl(&change.current));
                        if let Some(ttl) = ttl {
                            let at = expiry_at(now, ttl);
                            if state.expiry.track(change.key, at) {
                                new_groups.push(at);
                            }
                        }
                    }
                    ChangeReason::Remove => {
                        if let Some(at) = state.expiry.forget(change.key) {
                            new_groups.retain(|group| *group != at);
                            cancelled.extend(state.timers.remove(&at));
                        }
                    }
                    _ => {}
                }
            }
            (changes, new_groups, cancelled)
        });
        drop(cancelled);

        for at in new_groups {
            let weak = Arc::downgrade(self);
            let delay = at.saturating_sub(now);
            match self
                .options
                .scheduler
                .schedule(delay, Box::new(move || expire(&weak, at)))
            {
                Ok(timer) => {
                    debug!(
                        group_at_ms = at.as_millis() as u64,
                        delay_ms = delay.as_millis() as u64,
                        "expiry group scheduled"
                    );
                    let replaced = guard.with(|state| state.timers.insert(at, timer));
                    drop(replaced);
                }
                Err(error) => {
                    warn!(
                        group_at_ms = at.as_millis() as u64,
                        %error,
                        "scheduler rejected expiry timer"
                    );
                    self.fail(error);
                    return;
                }
            }
        }

        if changes.is_empty() {
            return;
        }
        let evicted = changes.removes();
        if evicted > 0 {
            debug!(evicted, limit = self.options.limit, "capacity eviction");
        }
        self.sink.next(changes);
    }

    fn on_expired(&self, at: Duration) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }
        let (changes, timer, pending) = guard.with(|state| {
            let members = state.expiry.take(at);
            let timer = state.timers.remove(&at);
            (state.list.remove_many(&members), timer, state.expiry.group_count())
        });
        drop(timer);

        debug!(
            group_at_ms = at.as_millis() as u64,
            expired = changes.len(),
            pending,
            "expiry group fired"
        );
        if !changes.is_empty() {
            self.sink.next(changes);
        }
    }

    fn fail(&self, error: Error) {
        let guard = self.gate.lock();
        let timers = guard.with(IngestState::take_timers);
        self.upstream.dispose();
        drop(timers);
        self.sink.error(error);
    }

    fn complete(&self) {
        let guard = self.gate.lock();
        let timers = guard.with(IngestState::take_timers);
        drop(timers);
        self.sink.completed();
    }

    fn dispose(&self) {
        self.upstream.dispose();
        let guard = self.gate.lock();
        self.sink.stop();
        let (timers, released) = guard.with(|state| (state.take_timers(), state.list.clear()));
        drop(timers);
        trace!(released = released.len(), "ingestion disposed");
    }
}

fn expire<T>(core: &Weak<IngestCore<T>>, at: Duration)
where
    T: Clone + Send + Sync + 'static,
{
    if let Some(core) = core.upgrade() {
        core.on_expired(at);
    }
}

struct BatchObserver<T>(Arc<IngestCore<T>>);

impl<T> Observer<Vec<T>> for BatchObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_next(&self, batch: Vec<T>) {
        self.0.on_batch(batch);
    }

    fn on_error(&self, error: Error) {
        self.0.fail(error);
    }

    fn on_completed(&self) {
        self.0.complete();
    }
}

impl<S, T> Observable<ChangeSet<T, ItemId>> for ToObservableChangeSet<S, T>
where
    S: Observable<Vec<T>>,
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<T, ItemId>>>) -> Subscription {
        let core = Arc::new(IngestCore {
            gate: Gate::new(IngestState {
                list: BoundedList::new(self.options.limit),
                expiry: ExpiryIndex::new(),
                timers: HashMap::new(),
            }),
            sink: Sink::new(observer),
            options: self.options.clone(),
            upstream: SubscriptionSlot::new(),
        });

        let upstream = self.source.subscribe(Arc::new(BatchObserver(core.clone())));
        core.upstream.set(upstream);
        trace!(limit = self.options.limit, "ingestion subscribed");

        Subscription::new(move || core.dispose())
    }
}
