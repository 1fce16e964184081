//! Observers and the emitting side of a stream.

use ripple_core::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives the values of an observable.
///
/// Values arrive strictly in order and are followed by at most one terminal
/// event: either `on_error` or `on_completed`, never both.
pub trait Observer<T>: Send + Sync {
    /// Receives the next value.
    fn on_next(&self, value: T);

    /// Receives the error that terminated the stream.
    fn on_error(&self, error: Error);

    /// Receives the successful end of the stream.
    fn on_completed(&self);
}

/// An observer built from closures.
pub struct FnObserver<N, E, C> {
    next: N,
    error: E,
    completed: C,
}

impl<T, N, E, C> Observer<T> for FnObserver<N, E, C>
where
    N: Fn(T) + Send + Sync,
    E: Fn(Error) + Send + Sync,
    C: Fn() + Send + Sync,
{
    fn on_next(&self, value: T) {
        (self.next)(value)
    }

    fn on_error(&self, error: Error) {
        (self.error)(error)
    }

    fn on_completed(&self) {
        (self.completed)()
    }
}

/// Creates an observer that only handles values.
pub fn observer<T, N>(next: N) -> FnObserver<N, fn(Error), fn()>
where
    N: Fn(T) + Send + Sync,
{
    FnObserver {
        next,
        error: |_| {},
        completed: || {},
    }
}

/// Creates an observer that handles values and both terminal events.
pub fn observer_with<T, N, E, C>(next: N, error: E, completed: C) -> FnObserver<N, E, C>
where
    N: Fn(T) + Send + Sync,
    E: Fn(Error) + Send + Sync,
    C: Fn() + Send + Sync,
{
    FnObserver {
        next,
        error,
        completed,
    }
}

/// The emitting side of a stream.
///
/// Enforces the observer grammar: after the first terminal event every
/// further call is dropped.
pub struct Sink<T> {
    observer: Arc<dyn Observer<T>>,
    stopped: AtomicBool,
}

impl<T> Sink<T> {
    /// Wraps `observer`.
    pub fn new(observer: Arc<dyn Observer<T>>) -> Self {
        Self {
            observer,
            stopped: AtomicBool::new(false),
        }
    }

    /// Returns true once the stream terminated or was stopped.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Delivers a value unless the stream has terminated.
    pub fn next(&self, value: T) {
        if !self.is_stopped() {
            self.observer.on_next(value);
        }
    }

    /// Silences the stream without notifying the observer.
    ///
    /// Used on dispose: nothing reaches the observer afterwards, not even a
    /// value that was already in flight.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Terminates the stream with `error`.
    ///
    /// Returns false if the stream had already terminated.
    pub fn error(&self, error: Error) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.observer.on_error(error);
        true
    }

    /// Terminates the stream successfully.
    ///
    /// Returns false if the stream had already terminated.
    pub fn completed(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.observer.on_completed();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Observer<i32> for Recorder {
        fn on_next(&self, value: i32) {
            self.events.lock().push(format!("next {value}"));
        }

        fn on_error(&self, error: Error) {
            self.events.lock().push(format!("error {error}"));
        }

        fn on_completed(&self) {
            self.events.lock().push("completed".into());
        }
    }

    #[test]
    fn test_sink_forwards_until_terminal() {
        let recorder = Arc::new(Recorder::default());
        let sink: Sink<i32> = Sink::new(recorder.clone());

        sink.next(1);
        assert!(sink.completed());
        sink.next(2);
        assert!(!sink.error(Error::Disposed));
        assert!(!sink.completed());

        assert!(sink.is_stopped());
        assert_eq!(*recorder.events.lock(), vec!["next 1", "completed"]);
    }

    #[test]
    fn test_sink_single_error() {
        let recorder = Arc::new(Recorder::default());
        let sink: Sink<i32> = Sink::new(recorder.clone());

        assert!(sink.error(Error::source_failed("boom")));
        assert!(!sink.error(Error::source_failed("again")));

        assert_eq!(*recorder.events.lock(), vec!["error source failed: boom"]);
    }

    #[test]
    fn test_sink_stop_is_silent() {
        let recorder = Arc::new(Recorder::default());
        let sink: Sink<i32> = Sink::new(recorder.clone());

        sink.next(1);
        sink.stop();
        sink.next(2);
        assert!(!sink.completed());
        assert!(!sink.error(Error::Disposed));

        assert_eq!(*recorder.events.lock(), vec!["next 1"]);
    }

    #[test]
    fn test_fn_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicBool::new(false));
        let (s, d) = (seen.clone(), done.clone());
        let o = observer_with(
            move |v: i32| s.lock().push(v),
            |_| {},
            move || d.store(true, Ordering::SeqCst),
        );

        o.on_next(3);
        o.on_completed();
        assert_eq!(*seen.lock(), vec![3]);
        assert!(done.load(Ordering::SeqCst));
    }
}
