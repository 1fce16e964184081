//! Snapshot stream to change-set stream.

use crate::gate::Gate;
use crate::observable::Observable;
use crate::observer::{Observer, Sink};
use crate::subscription::{Subscription, SubscriptionSlot};
use ripple_core::{ChangeSet, Error};
use ripple_incremental::{Equality, KeySelector, SnapshotDiffer, ValueEquality};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// Turns a stream of full snapshots into the change sets between them.
///
/// Exactly one change set is emitted per snapshot, including empty ones when
/// nothing changed. Each subscription diffs against its own previous
/// snapshot, starting from an empty one.
///
/// ```rust
/// use ripple_reactive::{ChangeSetAggregator, SnapshotExt, Subject};
///
/// let snapshots = Subject::<Vec<(u32, &str)>>::new();
/// let diffs = snapshots.clone().edit_diff(|item: &(u32, &str)| item.0);
/// let results = ChangeSetAggregator::new(&diffs);
///
/// snapshots.on_next(vec![(1, "a")]);
/// snapshots.on_next(vec![(1, "a")]);
/// snapshots.on_next(vec![(1, "b")]);
///
/// let messages = results.messages();
/// assert_eq!(messages.len(), 3);
/// assert!(messages[1].is_empty());
/// assert_eq!(messages[2].updates(), 1);
/// ```
pub struct EditDiff<S, T, K, Sel, E> {
    source: S,
    selector: Arc<Sel>,
    equality: Arc<E>,
    _marker: PhantomData<fn(T) -> K>,
}

impl<S, T, K, Sel> EditDiff<S, T, K, Sel, ValueEquality> {
    /// Diffs the snapshots of `source`, keyed by `selector`, comparing items
    /// with `PartialEq`.
    pub fn new(source: S, selector: Sel) -> Self {
        Self {
            source,
            selector: Arc::new(selector),
            equality: Arc::new(ValueEquality),
            _marker: PhantomData,
        }
    }
}

impl<S, T, K, Sel, E> EditDiff<S, T, K, Sel, E> {
    /// Compares items with `equality` instead.
    pub fn with_equality<E2>(self, equality: E2) -> EditDiff<S, T, K, Sel, E2> {
        EditDiff {
            source: self.source,
            selector: self.selector,
            equality: Arc::new(equality),
            _marker: PhantomData,
        }
    }
}

struct DiffObserver<T, K, Sel, E> {
    differ: Gate<SnapshotDiffer<T, K>>,
    sink: Sink<ChangeSet<T, K>>,
    selector: Arc<Sel>,
    equality: Arc<E>,
    upstream: Arc<SubscriptionSlot>,
}

impl<T, K, Sel, E> DiffObserver<T, K, Sel, E> {
    fn dispose(&self) {
        self.upstream.dispose();
        let _guard = self.differ.lock();
        self.sink.stop();
        trace!("edit_diff disposed");
    }
}

impl<T, K, Sel, E> Observer<Vec<T>> for DiffObserver<T, K, Sel, E>
where
    T: Clone + Send,
    K: Clone + Eq + Hash + Send,
    Sel: KeySelector<T, K> + Send + Sync,
    E: Equality<T> + Send + Sync,
{
    fn on_next(&self, snapshot: Vec<T>) {
        let guard = self.differ.lock();
        if self.sink.is_stopped() {
            return;
        }
        let diff = guard.with(|differ| differ.diff(snapshot, &*self.selector, &*self.equality));
        match diff {
            Ok(changes) => self.sink.next(changes),
            Err(error) => {
                self.upstream.dispose();
                self.sink.error(error);
            }
        }
    }

    fn on_error(&self, error: Error) {
        let _guard = self.differ.lock();
        self.sink.error(error);
    }

    fn on_completed(&self) {
        let _guard = self.differ.lock();
        self.sink.completed();
    }
}

impl<S, T, K, Sel, E> Observable<ChangeSet<T, K>> for EditDiff<S, T, K, Sel, E>
where
    S: Observable<Vec<T>>,
    T: Clone + Send + 'static,
    K: Clone + Eq + Hash + Send + 'static,
    Sel: KeySelector<T, K> + Send + Sync + 'static,
    E: Equality<T> + Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<T, K>>>) -> Subscription {
        let upstream = Arc::new(SubscriptionSlot::new());
        let diff_observer = Arc::new(DiffObserver {
            differ: Gate::new(SnapshotDiffer::new()),
            sink: Sink::new(observer),
            selector: self.selector.clone(),
            equality: self.equality.clone(),
            upstream: upstream.clone(),
        });
        upstream.set(self.source.subscribe(diff_observer.clone()));
        trace!("edit_diff subscribed");

        Subscription::new(move || diff_observer.dispose())
    }
}
