//! Filtering driven by a per-item boolean source.
//!
//! Every tracked item subscribes to its own `Observable<bool>`. The latest
//! boolean decides whether the item is part of the downstream view; a new
//! boolean re-evaluates the item, either at once or, with a buffer window,
//! together with every other item that changed within the window.

use crate::gate::{Gate, GateGuard};
use crate::observable::{Observable, ObservableExt};
use crate::observer::{Observer, Sink};
use crate::scheduler::Scheduler;
use crate::subscription::{Subscription, SubscriptionSlot};
use hashbrown::HashSet;
use ripple_core::{Change, ChangeReason, ChangeSet, Error, Result};
use ripple_incremental::{ProxyTable, RefreshAware};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// How per-item booleans are turned into downstream change sets.
#[derive(Clone)]
pub enum FilterOptions {
    /// Every new boolean is evaluated at once.
    Immediate,
    /// New booleans are collected for `window` and evaluated together.
    Buffered {
        window: Duration,
        scheduler: Arc<dyn Scheduler>,
    },
}

impl fmt::Debug for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOptions::Immediate => f.write_str("Immediate"),
            FilterOptions::Buffered { window, .. } => {
                f.debug_struct("Buffered").field("window", window).finish()
            }
        }
    }
}

impl FilterOptions {
    /// Evaluates every new boolean at once.
    pub fn immediate() -> Self {
        FilterOptions::Immediate
    }

    /// Collects new booleans for `window` before evaluating them.
    pub fn buffered(window: Duration, scheduler: impl Scheduler + 'static) -> Self {
        FilterOptions::Buffered {
            window,
            scheduler: Arc::new(scheduler),
        }
    }

    /// Rejects a zero-length buffer window.
    pub fn validate(&self) -> Result<()> {
        match self {
            FilterOptions::Buffered { window, .. } if window.is_zero() => Err(
                Error::invalid_argument("window", "buffer window must be greater than zero"),
            ),
            _ => Ok(()),
        }
    }
}

/// Keeps the items whose own boolean source last reported `true`.
///
/// For every upstream Add or Update, `factory(item, key)` builds the item's
/// boolean source, which is subscribed through `distinct_until_changed`.
/// Values a source produces synchronously while an upstream change set is
/// being processed are folded into that change set's output, so one
/// upstream change set yields at most one downstream change set. Empty
/// change sets are never emitted.
///
/// A failing item source fails the whole stream. Upstream completion
/// completes the stream after the pending re-evaluations are flushed.
pub struct FilterOnObservable<S, F, T, K> {
    source: S,
    factory: Arc<F>,
    options: FilterOptions,
    _marker: PhantomData<fn(T) -> K>,
}

impl<S, F, T, K> FilterOnObservable<S, F, T, K> {
    /// Filters `source` by the boolean sources `factory` builds.
    ///
    /// Fails with [`Error::InvalidArgument`] when the options are invalid.
    pub fn new<O>(source: S, factory: F, options: FilterOptions) -> Result<Self>
    where
        F: Fn(&T, &K) -> O,
    {
        options.validate()?;
        Ok(Self {
            source,
            factory: Arc::new(factory),
            options,
            _marker: PhantomData,
        })
    }
}

struct FilterState<T, K> {
    proxies: ProxyTable<T, K, Subscription>,
    /// Keys with a new boolean awaiting evaluation, in arrival order
    pending: Vec<K>,
    pending_set: HashSet<K>,
    /// True while an upstream change set is being processed
    batching: bool,
    window: Option<Subscription>,
    window_armed: bool,
}

impl<T, K> FilterState<T, K>
where
    T: Clone,
    K: Clone + Eq + Hash,
{
    fn mark(&mut self, key: &K) {
        if self.pending_set.insert(key.clone()) {
            self.pending.push(key.clone());
        }
    }

    fn unmark(&mut self, key: &K) {
        self.pending_set.remove(key);
    }

    /// Evaluates every pending key.
    fn flush(&mut self) -> Vec<Change<T, K>> {
        let pending = std::mem::take(&mut self.pending);
        let mut changes = Vec::new();
        for key in pending {
            if self.pending_set.remove(&key) {
                changes.extend(self.proxies.reevaluate(&key));
            }
        }
        changes
    }

    /// Drops every proxy and timer, returning the subscriptions to release.
    fn teardown(&mut self) -> Vec<Subscription> {
        self.pending.clear();
        self.pending_set.clear();
        self.window_armed = false;
        let mut released = self.proxies.drain_handles();
        released.extend(self.window.take());
        released
    }
}

/// What a new per-item boolean leads to once the state is updated.
enum Next<T, K> {
    Nothing,
    Emit(Change<T, K>),
    ArmWindow(Duration, Arc<dyn Scheduler>),
}

struct FilterCore<T, K, F> {
    gate: Gate<FilterState<T, K>>,
    sink: Sink<ChangeSet<T, K>>,
    factory: Arc<F>,
    options: FilterOptions,
    upstream: SubscriptionSlot,
}

impl<T, K, F, O> FilterCore<T, K, F>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<bool> + 'static,
{
    fn on_changes(self: &Arc<Self>, changes: ChangeSet<T, K>) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }
        guard.with(|state| state.batching = true);

        let mut out = Vec::new();
        let mut released = Vec::new();
        for change in changes {
            let key = change.key;
            match change.reason {
                ChangeReason::Add | ChangeReason::Update => {
                    let item = change.current.clone();
                    let mut upserted = guard.with(|state| state.proxies.upsert(key.clone(), item));
                    released.extend(upserted.handle.take());

                    let generation = upserted.generation;
                    let subscription = self.subscribe_item(&change.current, &key, generation);
                    let attached =
                        guard.with(|state| state.proxies.attach(&key, generation, subscription));
                    if let Err(stale) = attached {
                        released.push(stale);
                    }
                    if self.sink.is_stopped() {
                        return;
                    }
                    let evaluated = guard.with(|state| {
                        state.unmark(&key);
                        state.proxies.reevaluate_replaced(&key, &upserted)
                    });
                    out.extend(evaluated);
                }
                ChangeReason::Remove | ChangeReason::Clear => {
                    let (removed, handle) = guard.with(|state| {
                        state.unmark(&key);
                        state.proxies.remove(&key)
                    });
                    out.extend(removed);
                    released.extend(handle);
                }
                ChangeReason::Refresh => {
                    out.extend(guard.with(|state| state.proxies.on_refresh(&key, &change.current)));
                }
                ChangeReason::Moved => {}
            }
        }

        out.extend(guard.with(|state| {
            state.batching = false;
            state.flush()
        }));
        trace!(released = released.len(), "released replaced item subscriptions");
        drop(released);

        if !out.is_empty() {
            self.sink.next(ChangeSet::new(out));
        }
    }

    fn subscribe_item(self: &Arc<Self>, item: &T, key: &K, generation: u64) -> Subscription {
        let source = (self.factory)(item, key);
        let observer = ItemObserver {
            core: Arc::downgrade(self),
            key: key.clone(),
            generation,
        };
        trace!(generation, "subscribing item source");
        source.distinct_until_changed().subscribe(Arc::new(observer))
    }

    fn on_item(self: &Arc<Self>, key: &K, generation: u64, passes: bool) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }

        let next = guard.with(|state| {
            if !state.proxies.observe(key, generation, passes) {
                return Next::Nothing;
            }
            if state.batching {
                state.mark(key);
                return Next::Nothing;
            }
            match &self.options {
                FilterOptions::Immediate => match state.proxies.reevaluate(key) {
                    Some(change) => Next::Emit(change),
                    None => Next::Nothing,
                },
                FilterOptions::Buffered { window, scheduler } => {
                    state.mark(key);
                    if state.window_armed {
                        Next::Nothing
                    } else {
                        state.window_armed = true;
                        Next::ArmWindow(*window, scheduler.clone())
                    }
                }
            }
        });

        match next {
            Next::Nothing => {}
            Next::Emit(change) => self.sink.next(ChangeSet::new(vec![change])),
            Next::ArmWindow(window, scheduler) => {
                self.arm_window(&guard, window, scheduler.as_ref())
            }
        }
    }

    fn arm_window(
        self: &Arc<Self>,
        guard: &GateGuard<'_, FilterState<T, K>>,
        window: Duration,
        scheduler: &dyn Scheduler,
    ) {
        let core = Arc::downgrade(self);
        let task = Box::new(move || {
            if let Some(core) = core.upgrade() {
                core.on_window();
            }
        });
        match scheduler.schedule(window, task) {
            Ok(timer) => {
                let replaced = guard.with(|state| state.window.replace(timer));
                drop(replaced);
            }
            Err(error) => {
                warn!(%error, "scheduler rejected buffer window");
                self.fail(error);
            }
        }
    }

    fn on_window(&self) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }
        let (changes, timer) = guard.with(|state| {
            state.window_armed = false;
            (state.flush(), state.window.take())
        });
        drop(timer);
        debug!(changes = changes.len(), "buffer window flushed");
        if !changes.is_empty() {
            self.sink.next(ChangeSet::new(changes));
        }
    }
}

impl<T, K, F> FilterCore<T, K, F>
where
    T: Clone,
    K: Clone + Eq + Hash,
{
    fn fail(&self, error: Error) {
        let guard = self.gate.lock();
        let released = guard.with(FilterState::teardown);
        self.upstream.dispose();
        drop(released);
        self.sink.error(error);
    }

    fn complete(&self) {
        let guard = self.gate.lock();
        let (changes, released) = guard.with(|state| (state.flush(), state.teardown()));
        drop(released);
        if !changes.is_empty() {
            self.sink.next(ChangeSet::new(changes));
        }
        self.sink.completed();
    }

    fn dispose(&self) {
        self.upstream.dispose();
        let guard = self.gate.lock();
        self.sink.stop();
        let released = guard.with(FilterState::teardown);
        trace!(released = released.len(), "filter_on_observable disposed");
        drop(released);
    }
}

struct UpstreamObserver<T, K, F>(Arc<FilterCore<T, K, F>>);

impl<T, K, F, O> Observer<ChangeSet<T, K>> for UpstreamObserver<T, K, F>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<bool> + 'static,
{
    fn on_next(&self, changes: ChangeSet<T, K>) {
        self.0.on_changes(changes);
    }

    fn on_error(&self, error: Error) {
        self.0.fail(error);
    }

    fn on_completed(&self) {
        self.0.complete();
    }
}

struct ItemObserver<T, K, F> {
    core: Weak<FilterCore<T, K, F>>,
    key: K,
    generation: u64,
}

impl<T, K, F, O> Observer<bool> for ItemObserver<T, K, F>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<bool> + 'static,
{
    fn on_next(&self, passes: bool) {
        if let Some(core) = self.core.upgrade() {
            core.on_item(&self.key, self.generation, passes);
        }
    }

    fn on_error(&self, error: Error) {
        if let Some(core) = self.core.upgrade() {
            debug!(generation = self.generation, %error, "item source failed");
            core.fail(error);
        }
    }

    fn on_completed(&self) {}
}

impl<S, F, T, K, O> Observable<ChangeSet<T, K>> for FilterOnObservable<S, F, T, K>
where
    S: Observable<ChangeSet<T, K>>,
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<bool> + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<T, K>>>) -> Subscription {
        let core = Arc::new(FilterCore {
            gate: Gate::new(FilterState {
                proxies: ProxyTable::new(),
                pending: Vec::new(),
                pending_set: HashSet::new(),
                batching: false,
                window: None,
                window_armed: false,
            }),
            sink: Sink::new(observer),
            factory: self.factory.clone(),
            options: self.options.clone(),
            upstream: SubscriptionSlot::new(),
        });

        let upstream = self.source.subscribe(Arc::new(UpstreamObserver(core.clone())));
        core.upstream.set(upstream);
        trace!(options = ?self.options, "filter_on_observable subscribed");

        Subscription::new(move || core.dispose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ChangeSetAggregator;
    use crate::scheduler::VirtualScheduler;
    use crate::source::from_iter;
    use crate::subject::Subject;
    use hashbrown::HashMap;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Per-key boolean subjects the factory hands out.
    #[derive(Clone, Default)]
    struct Switches {
        subjects: Arc<Mutex<HashMap<u32, Subject<bool>>>>,
    }

    impl Switches {
        fn get(&self, key: u32) -> Subject<bool> {
            self.subjects.lock().entry(key).or_default().clone()
        }

        fn set(&self, key: u32, value: bool) {
            self.get(key).on_next(value);
        }
    }

    fn filtered(
        source: &Subject<ChangeSet<&'static str, u32>>,
        switches: &Switches,
        options: FilterOptions,
    ) -> ChangeSetAggregator<&'static str, u32> {
        let switches = switches.clone();
        let filter = FilterOnObservable::new(
            source.clone(),
            move |_: &&'static str, key: &u32| switches.get(*key),
            options,
        )
        .unwrap();
        ChangeSetAggregator::new(&filter)
    }

    #[test]
    fn test_zero_window_rejected() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let result = FilterOnObservable::new(
            source,
            |_: &&'static str, _: &u32| from_iter(vec![true]),
            FilterOptions::buffered(Duration::ZERO, VirtualScheduler::new()),
        );
        assert!(matches!(result, Err(Error::InvalidArgument { name: "window", .. })));
    }

    #[test]
    fn test_toggle_sequence() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let results = filtered(&source, &switches, FilterOptions::immediate());

        source.on_next(ChangeSet::new(vec![Change::add(1, "a")]));
        assert_eq!(results.message_count(), 0);

        switches.set(1, true);
        switches.set(1, false);
        switches.set(1, true);
        switches.set(1, true);

        let messages = results.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].as_slice(), &[Change::add(1, "a")]);
        assert_eq!(messages[1].as_slice(), &[Change::remove(1, "a")]);
        assert_eq!(messages[2].as_slice(), &[Change::add(1, "a")]);
    }

    #[test]
    fn test_synchronous_values_fold_into_upstream_change_set() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let filter = FilterOnObservable::new(
            source.clone(),
            |item: &&'static str, _: &u32| from_iter(vec![item.starts_with('k')]),
            FilterOptions::immediate(),
        )
        .unwrap();
        let results = ChangeSetAggregator::new(&filter);

        source.on_next(ChangeSet::new(vec![
            Change::add(1, "keep"),
            Change::add(2, "drop"),
            Change::add(3, "kept"),
        ]));

        let messages = results.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].as_slice(),
            &[Change::add(1, "keep"), Change::add(3, "kept")]
        );

        source.on_next(ChangeSet::new(vec![Change::add(4, "drop")]));
        assert_eq!(results.message_count(), 1);
    }

    #[test]
    fn test_upstream_update_resubscribes() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let filter = FilterOnObservable::new(
            source.clone(),
            |item: &&'static str, _: &u32| from_iter(vec![item.len() > 1]),
            FilterOptions::immediate(),
        )
        .unwrap();
        let results = ChangeSetAggregator::new(&filter);

        source.on_next(ChangeSet::new(vec![Change::add(1, "aa")]));
        source.on_next(ChangeSet::new(vec![Change::update(1, "bb", "aa")]));
        source.on_next(ChangeSet::new(vec![Change::update(1, "c", "bb")]));
        source.on_next(ChangeSet::new(vec![Change::update(1, "dd", "c")]));

        let messages = results.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].as_slice(), &[Change::update(1, "bb", "aa")]);
        assert_eq!(messages[2].as_slice(), &[Change::remove(1, "bb")]);
        assert_eq!(messages[3].as_slice(), &[Change::add(1, "dd")]);
    }

    #[test]
    fn test_stale_source_ignored_after_update() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let generation = Arc::new(Mutex::new(0u32));
        let (s, g) = (switches.clone(), generation.clone());
        let filter = FilterOnObservable::new(
            source.clone(),
            move |_: &&'static str, _: &u32| {
                let mut n = g.lock();
                *n += 1;
                s.get(*n)
            },
            FilterOptions::immediate(),
        )
        .unwrap();
        let results = ChangeSetAggregator::new(&filter);

        source.on_next(ChangeSet::new(vec![Change::add(1, "a")]));
        source.on_next(ChangeSet::new(vec![Change::update(1, "b", "a")]));

        // The first subject belongs to the replaced item.
        switches.set(1, true);
        assert_eq!(results.message_count(), 0);
        assert_eq!(switches.get(1).observer_count(), 0);

        switches.set(2, true);
        assert_eq!(results.messages()[0].as_slice(), &[Change::add(1, "b")]);
    }

    #[test]
    fn test_remove_and_refresh() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let results = filtered(&source, &switches, FilterOptions::immediate());

        source.on_next(ChangeSet::new(vec![Change::add(1, "a"), Change::add(2, "b")]));
        switches.set(1, true);

        source.on_next(ChangeSet::new(vec![
            Change::refresh(1, "a"),
            Change::refresh(2, "b"),
        ]));
        source.on_next(ChangeSet::new(vec![Change::remove(1, "a"), Change::remove(2, "b")]));

        let messages = results.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].as_slice(), &[Change::refresh(1, "a")]);
        assert_eq!(messages[2].as_slice(), &[Change::remove(1, "a")]);
        assert_eq!(switches.get(1).observer_count(), 0);
        assert_eq!(switches.get(2).observer_count(), 0);
    }

    #[test]
    fn test_buffered_window_coalesces() {
        let scheduler = VirtualScheduler::new();
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let results = filtered(
            &source,
            &switches,
            FilterOptions::buffered(Duration::from_millis(100), scheduler.clone()),
        );

        source.on_next(ChangeSet::new(vec![
            Change::add(1, "a"),
            Change::add(2, "b"),
            Change::add(3, "c"),
        ]));
        switches.set(1, true);
        switches.set(2, true);
        switches.set(3, true);
        switches.set(3, false);
        assert_eq!(results.message_count(), 0);
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance_by(Duration::from_millis(100));
        let messages = results.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_slice(), &[Change::add(1, "a"), Change::add(2, "b")]);

        switches.set(1, false);
        scheduler.advance_by(Duration::from_millis(100));
        assert_eq!(results.messages()[1].as_slice(), &[Change::remove(1, "a")]);
    }

    #[test]
    fn test_item_error_fails_fast() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let results = filtered(&source, &switches, FilterOptions::immediate());

        source.on_next(ChangeSet::new(vec![Change::add(1, "a"), Change::add(2, "b")]));
        switches.set(1, true);
        switches.get(2).on_error(Error::source_failed("sensor"));

        assert_eq!(results.error(), Some(Error::source_failed("sensor")));
        assert_eq!(source.observer_count(), 0);
        assert_eq!(switches.get(1).observer_count(), 0);

        switches.set(1, false);
        assert_eq!(results.message_count(), 1);
    }

    #[test]
    fn test_upstream_error_and_completion() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let results = filtered(&source, &switches, FilterOptions::immediate());
        source.on_next(ChangeSet::new(vec![Change::add(1, "a")]));
        source.on_completed();

        assert!(results.is_completed());
        assert_eq!(switches.get(1).observer_count(), 0);

        let failing = Subject::<ChangeSet<&'static str, u32>>::new();
        let results = filtered(&failing, &switches, FilterOptions::immediate());
        failing.on_next(ChangeSet::new(vec![Change::add(7, "z")]));
        failing.on_error(Error::source_failed("upstream"));
        assert_eq!(results.error(), Some(Error::source_failed("upstream")));
        assert_eq!(switches.get(7).observer_count(), 0);
    }

    #[test]
    fn test_dispose_releases_item_sources() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let results = filtered(&source, &switches, FilterOptions::immediate());
        source.on_next(ChangeSet::new(vec![Change::add(1, "a"), Change::add(2, "b")]));

        results.dispose();
        assert_eq!(source.observer_count(), 0);
        assert_eq!(switches.get(1).observer_count(), 0);
        assert_eq!(switches.get(2).observer_count(), 0);
    }

    fn counted(
        source: &Subject<ChangeSet<&'static str, u32>>,
        switches: &Switches,
        options: FilterOptions,
        seen: &Arc<AtomicUsize>,
    ) -> Subscription {
        let switches = switches.clone();
        let filter = FilterOnObservable::new(
            source.clone(),
            move |_: &&'static str, key: &u32| switches.get(*key),
            options,
        )
        .unwrap();
        let counter = seen.clone();
        filter.subscribe_fn(move |_: ChangeSet<&'static str, u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispose_during_upstream_delivery_suppresses_output() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let operator = Arc::new(SubscriptionSlot::new());

        let handle = operator.clone();
        let _disposer =
            source.subscribe_fn(move |_: ChangeSet<&'static str, u32>| handle.dispose());

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let filter = FilterOnObservable::new(
            source.clone(),
            |_: &&'static str, _: &u32| from_iter(vec![true]),
            FilterOptions::immediate(),
        )
        .unwrap();
        operator.set(filter.subscribe_fn(move |_: ChangeSet<&'static str, u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        source.on_next(ChangeSet::new(vec![Change::add(1, "a")]));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(source.observer_count(), 1);
    }

    #[test]
    fn test_dispose_during_item_delivery_suppresses_output() {
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let operator = Arc::new(SubscriptionSlot::new());

        // Registered on the item's subject ahead of the filter's own observer.
        let handle = operator.clone();
        let _disposer = switches.get(1).subscribe_fn(move |_: bool| handle.dispose());

        let seen = Arc::new(AtomicUsize::new(0));
        operator.set(counted(&source, &switches, FilterOptions::immediate(), &seen));
        source.on_next(ChangeSet::new(vec![Change::add(1, "a")]));

        switches.set(1, true);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(source.observer_count(), 0);
    }

    #[test]
    fn test_dispose_before_window_suppresses_flush() {
        let scheduler = VirtualScheduler::new();
        let source = Subject::<ChangeSet<&'static str, u32>>::new();
        let switches = Switches::default();
        let window = Duration::from_millis(100);
        let seen = Arc::new(AtomicUsize::new(0));
        let subscription = Arc::new(counted(
            &source,
            &switches,
            FilterOptions::buffered(window, scheduler.clone()),
            &seen,
        ));

        // Due at the same instant as the window but queued ahead of it.
        let handle = subscription.clone();
        let _disposer = scheduler
            .schedule(window, Box::new(move || handle.dispose()))
            .unwrap();

        source.on_next(ChangeSet::new(vec![Change::add(1, "a"), Change::add(2, "b")]));
        switches.set(1, true);
        switches.set(2, true);
        assert_eq!(scheduler.pending(), 2);

        scheduler.advance_by(window);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(switches.get(1).observer_count(), 0);
    }
}
