//! Push-based observables and the combinators the change-set operators use.

use crate::observer::{observer, Observer};
use crate::subscription::Subscription;
use parking_lot::Mutex;
use ripple_core::Error;
use std::marker::PhantomData;
use std::sync::Arc;

/// A source of values delivered to observers.
///
/// Every call to `subscribe` starts an independent subscription; operators
/// keep their state per subscription, never per observable.
pub trait Observable<T>: Send + Sync {
    /// Subscribes `observer` and returns the handle that releases it.
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription;
}

/// A type-erased, shareable observable.
pub type SharedObservable<T> = Arc<dyn Observable<T>>;

impl<T, O: Observable<T> + ?Sized> Observable<T> for Arc<O> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        (**self).subscribe(observer)
    }
}

/// Combinators available on every observable.
pub trait ObservableExt<T>: Observable<T> + Sized {
    /// Transforms every value with `f`.
    fn map<U, F>(self, f: F) -> Map<Self, F, T>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Map {
            source: self,
            f: Arc::new(f),
            _marker: PhantomData,
        }
    }

    /// Drops values equal to the one delivered just before them.
    fn distinct_until_changed(self) -> DistinctUntilChanged<Self, T>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        DistinctUntilChanged {
            source: self,
            _marker: PhantomData,
        }
    }

    /// Subscribes a closure that only handles values.
    fn subscribe_fn<N>(&self, next: N) -> Subscription
    where
        N: Fn(T) + Send + Sync + 'static,
        T: 'static,
    {
        self.subscribe(Arc::new(observer(next)))
    }

    /// Erases the observable's type.
    fn shared(self) -> SharedObservable<T>
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<T, O: Observable<T>> ObservableExt<T> for O {}

/// See [`ObservableExt::map`].
pub struct Map<S, F, T> {
    source: S,
    f: Arc<F>,
    _marker: PhantomData<fn(T)>,
}

struct MapObserver<F, U> {
    downstream: Arc<dyn Observer<U>>,
    f: Arc<F>,
}

impl<T, U, F> Observer<T> for MapObserver<F, U>
where
    F: Fn(T) -> U + Send + Sync,
{
    fn on_next(&self, value: T) {
        self.downstream.on_next((self.f)(value));
    }

    fn on_error(&self, error: Error) {
        self.downstream.on_error(error);
    }

    fn on_completed(&self) {
        self.downstream.on_completed();
    }
}

impl<S, F, T, U> Observable<U> for Map<S, F, T>
where
    S: Observable<T>,
    F: Fn(T) -> U + Send + Sync + 'static,
    T: 'static,
    U: 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<U>>) -> Subscription {
        self.source.subscribe(Arc::new(MapObserver {
            downstream: observer,
            f: self.f.clone(),
        }))
    }
}

/// See [`ObservableExt::distinct_until_changed`].
pub struct DistinctUntilChanged<S, T> {
    source: S,
    _marker: PhantomData<fn(T)>,
}

struct DistinctObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    last: Mutex<Option<T>>,
}

impl<T> Observer<T> for DistinctObserver<T>
where
    T: Clone + PartialEq + Send,
{
    fn on_next(&self, value: T) {
        {
            let mut last = self.last.lock();
            if last.as_ref() == Some(&value) {
                return;
            }
            *last = Some(value.clone());
        }
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: Error) {
        self.downstream.on_error(error);
    }

    fn on_completed(&self) {
        self.downstream.on_completed();
    }
}

impl<S, T> Observable<T> for DistinctUntilChanged<S, T>
where
    S: Observable<T>,
    T: Clone + PartialEq + Send + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        self.source.subscribe(Arc::new(DistinctObserver {
            downstream: observer,
            last: Mutex::new(None),
        }))
    }
}
