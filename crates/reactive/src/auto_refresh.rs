//! Refresh signals driven by a per-item source.
//!
//! Every tracked item subscribes to its own observable. Each value that
//! source produces marks the item as changed in place: a Refresh for the
//! item is emitted downstream, so refresh-aware operators further down
//! re-evaluate it without the upstream collection changing.

use crate::filter_on_observable::FilterOptions;
use crate::gate::{Gate, GateGuard};
use crate::observable::Observable;
use crate::observer::{Observer, Sink};
use crate::scheduler::Scheduler;
use crate::subscription::{Subscription, SubscriptionSlot};
use hashbrown::HashSet;
use ripple_core::{Change, ChangeReason, ChangeSet, Error, Result};
use ripple_incremental::{ProxyTable, RefreshAware};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Buffering of refresh signals, shaped like the filter's options.
///
/// `Immediate` emits one Refresh per signal; `Buffered` collects the
/// signals of a window into one change set.
pub type RefreshOptions = FilterOptions;

/// Emits a Refresh for an item whenever its own source produces a value.
///
/// Upstream change sets are forwarded unchanged. For every Add or Update
/// the item's source is (re)built with `factory(item, key)` and subscribed;
/// a Remove releases it. Values an item source produces synchronously while
/// being subscribed are gathered into one change set of Refreshes that
/// follows the forwarded upstream change set.
///
/// Within a buffer window an item is refreshed at most once, carrying the
/// item as it is when the window closes. A failing item source fails the
/// whole stream; a completing one is ignored.
///
/// ```rust
/// use ripple_reactive::{Change, ChangeSet, ChangeSetAggregator, ChangeSetStreamExt, RefreshOptions, Subject};
///
/// let items = Subject::<ChangeSet<i32, u32>>::new();
/// let touched = Subject::<()>::new();
/// let signal = touched.clone();
/// let positive = items
///     .clone()
///     .auto_refresh_on_observable(move |_: &i32, _: &u32| signal.clone(), RefreshOptions::immediate())
///     .unwrap()
///     .filter(|v: &i32| *v > 0);
/// let results = ChangeSetAggregator::new(&positive);
///
/// items.on_next(ChangeSet::new(vec![Change::add(1, 5)]));
/// touched.on_next(());
///
/// assert_eq!(results.messages()[1].as_slice(), &[Change::refresh(1, 5)]);
/// ```
pub struct AutoRefreshOnObservable<S, F, T, K, X> {
    source: S,
    factory: Arc<F>,
    options: RefreshOptions,
    _marker: PhantomData<fn(T, X) -> K>,
}

impl<S, F, T, K, X> AutoRefreshOnObservable<S, F, T, K, X> {
    /// Refreshes the items of `source` whenever the sources `factory`
    /// builds produce a value.
    ///
    /// Fails with [`Error::InvalidArgument`] when the options are invalid.
    pub fn new<O>(source: S, factory: F, options: RefreshOptions) -> Result<Self>
    where
        F: Fn(&T, &K) -> O,
        O: Observable<X>,
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

struct RefreshState<T, K> {
    /// Tracked items; only the generation tags and handles are used
    proxies: ProxyTable<T, K, Subscription>,
    pending: Vec<K>,
    pending_set: HashSet<K>,
    batching: bool,
    window: Option<Subscription>,
    window_armed: bool,
}

impl<T, K> RefreshState<T, K>
where
    T: Clone,
    K: Clone + Eq + Hash,
{
    fn is_current(&self, key: &K, generation: u64) -> bool {
        self.proxies
            .get(key)
            .is_some_and(|proxy| proxy.generation() == generation)
    }

    fn mark(&mut self, key: &K) {
        if self.pending_set.insert(key.clone()) {
            self.pending.push(key.clone());
        }
    }

    fn refresh(&self, key: &K) -> Option<Change<T, K>> {
        let proxy = self.proxies.get(key)?;
        Some(Change::refresh(key.clone(), proxy.item().clone()))
    }

    /// Turns every pending key that is still tracked into a Refresh.
    fn flush(&mut self) -> Vec<Change<T, K>> {
        let pending = std::mem::take(&mut self.pending);
        let mut changes = Vec::new();
        for key in pending {
            if self.pending_set.remove(&key) {
                changes.extend(self.refresh(&key));
            }
        }
        changes
    }

    fn teardown(&mut self) -> Vec<Subscription> {
        self.pending.clear();
        self.pending_set.clear();
        self.window_armed = false;
        let mut released = self.proxies.drain_handles();
        released.extend(self.window.take());
        released
    }
}

enum Next<T, K> {
    Nothing,
    Emit(Change<T, K>),
    ArmWindow(Duration, Arc<dyn Scheduler>),
}

struct RefreshCore<T, K, F, X> {
    gate: Gate<RefreshState<T, K>>,
    sink: Sink<ChangeSet<T, K>>,
    factory: Arc<F>,
    options: RefreshOptions,
    upstream: SubscriptionSlot,
    _marker: PhantomData<fn(X)>,
}

impl<T, K, F, O, X> RefreshCore<T, K, F, X>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<X> + 'static,
    X: Send + 'static,
{
    fn on_changes(self: &Arc<Self>, changes: ChangeSet<T, K>) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }

        let mut released = Vec::new();
        let mut subscribe = Vec::new();
        guard.with(|state| {
            for change in &changes {
                let key = &change.key;
                match change.reason {
                    ChangeReason::Add | ChangeReason::Update => {
                        state.pending_set.remove(key);
                        let mut upserted =
                            state.proxies.upsert(key.clone(), change.current.clone());
                        released.extend(upserted.handle.take());
                        subscribe.push((key.clone(), change.current.clone(), upserted.generation));
                    }
                    ChangeReason::Remove | ChangeReason::Clear => {
                        state.pending_set.remove(key);
                        let (_, handle) = state.proxies.remove(key);
                        released.extend(handle);
                    }
                    ChangeReason::Refresh => {
                        // Nothing is ever included, so this only stores the item.
                        let _ = state.proxies.on_refresh(key, &change.current);
                    }
                    ChangeReason::Moved => {}
                }
            }
        });
        trace!(released = released.len(), "released item sources");
        drop(released);

        if !changes.is_empty() {
            self.sink.next(changes);
        }

        guard.with(|state| state.batching = true);
        for (key, item, generation) in subscribe {
            let subscription = self.subscribe_item(&item, &key, generation);
            let attached = guard.with(|state| state.proxies.attach(&key, generation, subscription));
            if let Err(stale) = attached {
                drop(stale);
            }
            if self.sink.is_stopped() {
                return;
            }
        }

        let refreshes = guard.with(|state| {
            state.batching = false;
            state.flush()
        });
        if !refreshes.is_empty() {
            self.sink.next(ChangeSet::new(refreshes));
        }
    }

    fn subscribe_item(self: &Arc<Self>, item: &T, key: &K, generation: u64) -> Subscription {
        let source = (self.factory)(item, key);
        let observer = ItemObserver {
            core: Arc::downgrade(self),
            key: key.clone(),
            generation,
        };
        source.subscribe(Arc::new(observer))
    }

    fn on_item(self: &Arc<Self>, key: &K, generation: u64) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }

        let next = guard.with(|state| {
            if !state.is_current(key, generation) {
                return Next::Nothing;
            }
            if state.batching {
                state.mark(key);
                return Next::Nothing;
            }
            match &self.options {
                FilterOptions::Immediate => state.refresh(key).map_or(Next::Nothing, Next::Emit),
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
        guard: &GateGuard<'_, RefreshState<T, K>>,
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
                warn!(%error, "scheduler rejected refresh window");
                self.fail(error);
            }
        }
    }

    fn on_window(&self) {
        let guard = self.gate.lock();
        if self.sink.is_stopped() {
            return;
        }
        let (refreshes, timer) = guard.with(|state| {
            state.window_armed = false;
            (state.flush(), state.window.take())
        });
        drop(timer);
        debug!(refreshes = refreshes.len(), "refresh window flushed");
        if !refreshes.is_empty() {
            self.sink.next(ChangeSet::new(refreshes));
        }
    }
}

impl<T, K, F, X> RefreshCore<T, K, F, X>
where
    T: Clone,
    K: Clone + Eq + Hash,
{
    fn fail(&self, error: Error) {
        let guard = self.gate.lock();
        let released = guard.with(RefreshState::teardown);
        self.upstream.dispose();
        drop(released);
        self.sink.error(error);
    }

    fn complete(&self) {
        let guard = self.gate.lock();
        let (refreshes, released) = guard.with(|state| (state.flush(), state.teardown()));
        drop(released);
        if !refreshes.is_empty() {
            self.sink.next(ChangeSet::new(refreshes));
        }
        self.sink.completed();
    }

    fn dispose(&self) {
        self.upstream.dispose();
        let guard = self.gate.lock();
        self.sink.stop();
        let released = guard.with(RefreshState::teardown);
        trace!(released = released.len(), "auto_refresh disposed");
        drop(released);
    }
}

struct UpstreamObserver<T, K, F, X>(Arc<RefreshCore<T, K, F, X>>);

impl<T, K, F, O, X> Observer<ChangeSet<T, K>> for UpstreamObserver<T, K, F, X>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<X> + 'static,
    X: Send + 'static,
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

struct ItemObserver<T, K, F, X> {
    core: Weak<RefreshCore<T, K, F, X>>,
    key: K,
    generation: u64,
}

impl<T, K, F, O, X> Observer<X> for ItemObserver<T, K, F, X>
where
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<X> + 'static,
    X: Send + 'static,
{
    fn on_next(&self, _: X) {
        if let Some(core) = self.core.upgrade() {
            core.on_item(&self.key, self.generation);
        }
    }

    fn on_error(&self, error: Error) {
        if let Some(core) = self.core.upgrade() {
            debug!(generation = self.generation, %error, "refresh source failed");
            core.fail(error);
        }
    }

    fn on_completed(&self) {}
}

impl<S, F, T, K, O, X> Observable<ChangeSet<T, K>> for AutoRefreshOnObservable<S, F, T, K, X>
where
    S: Observable<ChangeSet<T, K>>,
    T: Clone + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    F: Fn(&T, &K) -> O + Send + Sync + 'static,
    O: Observable<X> + 'static,
    X: Send + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<T, K>>>) -> Subscription {
        let core = Arc::new(RefreshCore {
            gate: Gate::new(RefreshState {
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
            _marker: PhantomData,
        });

        let upstream = self.source.subscribe(Arc::new(UpstreamObserver(core.clone())));
        core.upstream.set(upstream);
        trace!(options = ?self.options, "auto_refresh subscribed");

        Subscription::new(move || core.dispose())
    }
}
