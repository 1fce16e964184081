//! Multicast source driven by hand.

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::{Subscription, SubscriptionManager};
use parking_lot::Mutex;
use ripple_core::Error;
use std::sync::Arc;
use tracing::trace;

enum Terminal {
    Completed,
    Failed(Error),
}

struct SubjectState<T> {
    observers: SubscriptionManager<T>,
    terminal: Option<Terminal>,
}

/// An observable that forwards whatever is pushed into it to every
/// current observer.
///
/// Observers are notified outside the subject's lock, so they may
/// subscribe, unsubscribe or push into the subject while being notified.
/// Observers subscribing after a terminal event receive that event at once.
pub struct Subject<T> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subject<T> {
    /// Creates a subject with no observers.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                observers: SubscriptionManager::new(),
                terminal: None,
            })),
        }
    }

    /// Returns the number of current observers.
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    /// Returns true once the subject completed or failed.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }

    /// Terminates every observer with `error`.
    pub fn on_error(&self, error: Error) {
        let observers = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(Terminal::Failed(error.clone()));
            state.observers.drain()
        };
        for observer in observers {
            observer.on_error(error.clone());
        }
    }

    /// Completes every observer.
    pub fn on_completed(&self) {
        let observers = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(Terminal::Completed);
            state.observers.drain()
        };
        for observer in observers {
            observer.on_completed();
        }
    }
}

impl<T: Clone> Subject<T> {
    /// Delivers `value` to every current observer.
    pub fn on_next(&self, value: T) {
        let observers = {
            let state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.observers.snapshot()
        };
        for observer in observers {
            observer.on_next(value.clone());
        }
    }
}

impl<T: 'static> Observable<T> for Subject<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let id = {
            let mut state = self.state.lock();
            match &state.terminal {
                Some(Terminal::Completed) => None,
                Some(Terminal::Failed(error)) => Some(Err(error.clone())),
                None => Some(Ok(state.observers.subscribe(observer.clone()))),
            }
        };

        let id = match id {
            Some(Ok(id)) => id,
            Some(Err(error)) => {
                observer.on_error(error);
                return Subscription::empty();
            }
            None => {
                observer.on_completed();
                return Subscription::empty();
            }
        };

        trace!(subscription_id = id, "subject subscribed");
        let state = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                let removed = state.lock().observers.unsubscribe(id);
                trace!(subscription_id = id, removed, "subject unsubscribed");
            }
        })
    }
}

impl<T: Clone> Observer<T> for Subject<T>
where
    T: Send,
{
    fn on_next(&self, value: T) {
        Subject::on_next(self, value);
    }

    fn on_error(&self, error: Error) {
        Subject::on_error(self, error);
    }

    fn on_completed(&self) {
        Subject::on_completed(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::ObservableExt;
    use crate::observer::observer_with;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_multicast() {
        let subject = Subject::<i32>::new();
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));

        let (sa, sb) = (a.clone(), b.clone());
        let _a = subject.subscribe_fn(move |v| sa.lock().push(v));
        subject.on_next(1);
        let _b = subject.subscribe_fn(move |v| sb.lock().push(v));
        subject.on_next(2);

        assert_eq!(*a.lock(), vec![1, 2]);
        assert_eq!(*b.lock(), vec![2]);
        assert_eq!(subject.observer_count(), 2);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let subject = Subject::<i32>::new();
        let sub = subject.subscribe_fn(|_| {});
        assert_eq!(subject.observer_count(), 1);
        drop(sub);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_terminal_replayed_to_late_observers() {
        let subject = Subject::<i32>::new();
        subject.on_error(Error::source_failed("gone"));
        subject.on_next(1);

        let failed = Arc::new(Mutex::new(None));
        let f = failed.clone();
        let _sub = subject.subscribe(Arc::new(observer_with(
            |_: i32| panic!("no values after a terminal event"),
            move |e| *f.lock() = Some(e),
            || {},
        )));
        assert_eq!(*failed.lock(), Some(Error::source_failed("gone")));
        assert!(subject.is_terminated());
    }

    #[test]
    fn test_completed_once() {
        let subject = Subject::<i32>::new();
        let done = Arc::new(AtomicBool::new(false));
        let d = done.clone();
        let _sub = subject.subscribe(Arc::new(observer_with(
            |_: i32| {},
            |_| {},
            move || assert!(!d.swap(true, Ordering::SeqCst)),
        )));

        subject.on_completed();
        subject.on_completed();
        subject.on_error(Error::Disposed);
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_reentrant_push() {
        let subject = Subject::<i32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = subject.clone();
        let s = seen.clone();
        let _sub = subject.subscribe_fn(move |v| {
            s.lock().push(v);
            if v < 3 {
                inner.on_next(v + 1);
            }
        });

        subject.on_next(1);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }
}
