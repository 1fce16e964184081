//! Per-subscription serialization of operator state.
//!
//! Each operator subscription owns one `Gate`. Upstream values, timer
//! callbacks and per-item callbacks all pass through it, so the state is only
//! ever touched by one thread at a time. The lock is reentrant: a callback
//! that synchronously re-enters the same operator (an item source emitting
//! while being subscribed, a downstream observer disposing from inside
//! `on_next`) proceeds on the same thread.
//!
//! The state itself is only borrowed inside [`GateGuard::with`]. Calls into
//! observers, sources or subscriptions happen outside `with` while the guard
//! is still held, which keeps emissions ordered without ever holding the
//! borrow across foreign code.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;

pub(crate) struct Gate<S> {
    state: ReentrantMutex<RefCell<S>>,
}

impl<S> Gate<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    pub(crate) fn lock(&self) -> GateGuard<'_, S> {
        GateGuard {
            guard: self.state.lock(),
        }
    }
}

pub(crate) struct GateGuard<'a, S> {
    guard: ReentrantMutexGuard<'a, RefCell<S>>,
}

impl<S> GateGuard<'_, S> {
    /// Borrows the state for the duration of `f`.
    ///
    /// `f` must not call observers or sources.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.guard.borrow_mut())
    }
}
