//! Simple sources.

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::Subscription;
use ripple_core::{Change, ChangeSet, Error};
use ripple_incremental::KeySelector;
use std::marker::PhantomData;
use std::sync::Arc;

/// Emits a fixed sequence of values, then completes.
pub struct FromIter<T> {
    items: Arc<[T]>,
}

/// Creates an observable that emits `items` in order and completes.
pub fn from_iter<T>(items: impl IntoIterator<Item = T>) -> FromIter<T> {
    FromIter {
        items: items.into_iter().collect(),
    }
}

impl<T> Observable<T> for FromIter<T>
where
    T: Clone + Send + Sync,
{
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        for item in self.items.iter() {
            observer.on_next(item.clone());
        }
        observer.on_completed();
        Subscription::empty()
    }
}

/// Fails every observer with the same error.
pub struct Fail<T> {
    error: Error,
    _marker: PhantomData<fn() -> T>,
}

/// Creates an observable that fails immediately with `error`.
pub fn fail<T>(error: Error) -> Fail<T> {
    Fail {
        error,
        _marker: PhantomData,
    }
}

impl<T> Observable<T> for Fail<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        observer.on_error(self.error.clone());
        Subscription::empty()
    }
}

/// Never emits anything.
pub struct Never<T> {
    _marker: PhantomData<fn() -> T>,
}

/// Creates an observable that never emits and never terminates.
pub fn never<T>() -> Never<T> {
    Never {
        _marker: PhantomData,
    }
}

impl<T> Observable<T> for Never<T> {
    fn subscribe(&self, _observer: Arc<dyn Observer<T>>) -> Subscription {
        Subscription::empty()
    }
}

/// See [`as_observable_change_set`].
pub struct AsChangeSet<T, K, S> {
    items: Arc<[T]>,
    selector: Arc<S>,
    completable: bool,
    _marker: PhantomData<fn() -> K>,
}

/// Exposes an in-memory collection as a change-set stream.
///
/// Every subscriber receives one change set adding all items, keyed by
/// `selector`. The stream completes afterwards when `completable` is set and
/// stays open otherwise. A failing selector fails the stream.
pub fn as_observable_change_set<T, K, S>(
    items: impl IntoIterator<Item = T>,
    selector: S,
    completable: bool,
) -> AsChangeSet<T, K, S>
where
    S: KeySelector<T, K>,
{
    AsChangeSet {
        items: items.into_iter().collect(),
        selector: Arc::new(selector),
        completable,
        _marker: PhantomData,
    }
}

impl<T, K, S> Observable<ChangeSet<T, K>> for AsChangeSet<T, K, S>
where
    T: Clone + Send + Sync,
    S: KeySelector<T, K> + Send + Sync,
{
    fn subscribe(&self, observer: Arc<dyn Observer<ChangeSet<T, K>>>) -> Subscription {
        let changes: Result<Vec<_>, Error> = self
            .items
            .iter()
            .map(|item| Ok(Change::add(self.selector.select(item)?, item.clone())))
            .collect();

        match changes {
            Ok(changes) => {
                observer.on_next(ChangeSet::new(changes));
                if self.completable {
                    observer.on_completed();
                }
            }
            Err(error) => observer.on_error(error),
        }
        Subscription::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::observer_with;
    use parking_lot::Mutex;
    use ripple_incremental::TryKey;

    #[derive(Default)]
    struct Log {
        events: Mutex<Vec<String>>,
    }

    fn recorder<T: std::fmt::Debug + 'static>(log: &Arc<Log>) -> Arc<dyn Observer<T>> {
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        Arc::new(observer_with(
            move |v: T| a.events.lock().push(format!("{v:?}")),
            move |e| b.events.lock().push(format!("error: {e}")),
            move || c.events.lock().push("done".into()),
        ))
    }

    #[test]
    fn test_from_iter() {
        let log = Arc::new(Log::default());
        let _sub = from_iter(vec![1, 2]).subscribe(recorder::<i32>(&log));
        assert_eq!(*log.events.lock(), vec!["1", "2", "done"]);
    }

    #[test]
    fn test_fail_and_never() {
        let log = Arc::new(Log::default());
        let _a = fail::<i32>(Error::source_failed("x")).subscribe(recorder::<i32>(&log));
        let _b = never::<i32>().subscribe(recorder::<i32>(&log));
        assert_eq!(*log.events.lock(), vec!["error: source failed: x"]);
    }

    #[test]
    fn test_as_observable_change_set() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Mutex::new(false));
        let (s, d) = (seen.clone(), done.clone());

        let source = as_observable_change_set(vec!["a", "bb"], |s: &&str| s.len(), true);
        let _sub = source.subscribe(Arc::new(observer_with(
            move |cs: ChangeSet<&str, usize>| s.lock().push(cs),
            |_| {},
            move || *d.lock() = true,
        )));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_slice(), &[Change::add(1, "a"), Change::add(2, "bb")]);
        assert!(*done.lock());
    }

    #[test]
    fn test_as_observable_change_set_not_completable() {
        let log = Arc::new(Log::default());
        let source = as_observable_change_set(vec![1u8], |v: &u8| *v, false);
        let _sub = source.subscribe(recorder::<ChangeSet<u8, u8>>(&log));
        assert_eq!(log.events.lock().len(), 1);
    }

    #[test]
    fn test_as_observable_change_set_selector_failure() {
        let log = Arc::new(Log::default());
        let selector =
            TryKey(|_: &u8| -> ripple_core::Result<u8> { Err(Error::key_selector("bad")) });
        let source = as_observable_change_set(vec![1u8], selector, true);
        let _sub = source.subscribe(recorder::<ChangeSet<u8, u8>>(&log));
        assert_eq!(*log.events.lock(), vec!["error: key selector failed: bad"]);
    }
}
