//! Stateful keyed operators lifted onto change-set streams.
//!
//! Each subscription owns its own [`KeyedFilter`] or [`KeyedTransform`];
//! the predicate or projection is cloned into it.

use crate::gate::Gate;
use crate::observable::Observable;
use crate::observer::{Observer, Sink};
use crate::subscription::Subscription;
use ripple_core::{ChangeSet, Error};
use ripple_incremental::{KeyedFilter, KeyedTransform};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// Keeps the items matching a static predicate.
///
/// Unlike [`FilterOnObservable`](crate::FilterOnObservable) the predicate
/// only looks at the item, so membership only changes when upstream
/// changes. Upstream Refresh re-evaluates the predicate.
pub struct Filter<S, P, T, K> {
    source: S,
    predicate: P,
    _marker: PhantomData<fn(T) -> K>,
}

impl<S, P, T, K> Filter<S, P, T, K>
where
    P: Fn(&T) -> bool,
{
    /// Keeps the items of `source` for which `predicate` holds.
    pub fn new(source: S, predicate: P) -> Self {
        Self {
            source,
            predicate,
            _marker: PhantomData,
        }
    }
}

/// Projects every item with a function, keeping keys and indexes.
pub struct Transform<S, F, T, U, K> {
    source: S,
    transform: F,
    _marker: PhantomData<fn(T) -> (U, K)>,
}

impl<S, F, T, U, K> Transform<S, F, T, U, K>
where
    F: Fn(&T) -> U,
{
    /// Projects the items of `source` with `transform`.
    ///
    /// The projection runs again for every Add, Update and Refresh.
    pub fn new(source: S, transform: F) -> Self {
        Self {
            source,
            transform,
            _marker: PhantomData,
        }
    }
}

/// Forwards the non-empty output of a per-subscription operator.
struct OperatorObserver<Op, U, K> {
    operator: Gate<Op>,
    sink: Sink<ChangeSet<U, K>>,
}

impl<Op, U, K> OperatorObserver<Op, U, K> {
    fn forward(&self, apply: impl FnOnce(&mut Op) -> ChangeSet<U, K>) {
        let guard = self.operator.lock();
        if self.sink.is_stopped() {
            return;
        }
        let output = guard.with(apply);
        if !output.is_empty() {
            self.sink.next(output);
        }
    }

    fn error(&self, error: Error) {
        let _guard = self.operator.lock();
        self.sink.error(error);
    }

    fn completed(&self) {
        let _guard = self.operator.lock();
        self.sink.completed();
    }

    fn stop(&self) {
        let _guard = self.operator.lock();
        self.sink.stop();
    }
}

/// Releases `upstream`, then silences `observer`.
fn stopping<Op, U, K>(
    upstream: Subscription,
    observer: Arc<OperatorObserver<Op, U, K>>,
) -> Subscription
where
    Op: Send + 'static,
    U: 'static,
    K: 'static,
{
    Subscription::new(move || {
        upstream.dispose();
        observer.stop();
    })
}

impl<T, K, P> Observer<ChangeSet<T, K>> for OperatorObserver<KeyedFilter<T, K, P>, T, K>
where
    T: Clone + Send,
    K: Eq + Hash + Clone + Send,
    P: Fn(&T) -> bool + Send + Sync,
{
    fn on_next(&self, changes: ChangeSet<T, K>) {
        self.forward(|filter| filter.apply(&changes));
    }

    fn on_error(&self, error: Error) {
        self.error(error);
    }

    fn on_completed(&self) {
        self.completed();
    }
}

/// Adapts [`KeyedTransform`] to the operator observer.
struct Projection<T, U, K, F>(KeyedTransform<T, U, K, F>);

impl<T, U, K, F> Observer<ChangeSet<T, K>> for OperatorObserver<Projection<T, U, K, F>, U, K>
where
    T: Send,
    U: Clone + Send,
    K: Eq + Hash + Clone + Send,
    F: Fn(&T) -> U + Send + Sync,
{
    fn on_next(&self, changes: ChangeSet<T, K>) {
        self.forward(|projection| projection.0.apply(&changes));
    }

    fn on_error(&self, error: Error) {
        self.error(error);
    }

    fn on_completed(&self) {
        self.completed();
    }
}

impl<S, P, T, K> Observable<ChangeSet<T, K>> for Filter<S, P, T, K>
where
    S: Observable<ChangeSet<T, K>>,
    T: Clone + Send + 'static,
    K: Eq + Hash + Clone + Send + 'static,
    P: Fn(&T) -> bool + Clone + Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<T, K>>>) -> Subscription {
        let operator = Arc::new(OperatorObserver {
            operator: Gate::new(KeyedFilter::new(self.predicate.clone())),
            sink: Sink::new(observer),
        });
        let upstream = self.source.subscribe(operator.clone());
        trace!("filter subscribed");
        stopping(upstream, operator)
    }
}

impl<S, F, T, U, K> Observable<ChangeSet<U, K>> for Transform<S, F, T, U, K>
where
    S: Observable<ChangeSet<T, K>>,
    T: Send + 'static,
    U: Clone + Send + 'static,
    K: Eq + Hash + Clone + Send + 'static,
    F: Fn(&T) -> U + Clone + Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<U, K>>>) -> Subscription {
        let operator = Arc::new(OperatorObserver {
            operator: Gate::new(Projection(KeyedTransform::new(self.transform.clone()))),
            sink: Sink::new(observer),
        });
        let upstream = self.source.subscribe(operator.clone());
        trace!("transform subscribed");
        stopping(upstream, operator)
    }
}
