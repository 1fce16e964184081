//! Subscription handles and observer bookkeeping.
//!
//! A [`Subscription`] owns the teardown of whatever it was returned for.
//! Disposing it (explicitly or by dropping it) runs the teardown exactly
//! once. [`SubscriptionSlot`] holds a subscription that arrives after the
//! owner may already have been disposed, and [`SubscriptionManager`] tracks
//! the observers of a multicast source.

use crate::observer::Observer;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for an observer registered with a [`SubscriptionManager`].
pub type SubscriptionId = u64;

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle to an active subscription.
///
/// Dropping the handle disposes the subscription.
#[must_use = "dropping a Subscription disposes it"]
pub struct Subscription {
    teardown: Mutex<Option<Teardown>>,
    disposed: AtomicBool,
}

impl Subscription {
    /// Creates a subscription that runs `teardown` when disposed.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates a subscription with nothing to release.
    pub fn empty() -> Self {
        Self {
            teardown: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns true once the subscription has been disposed.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Releases the subscription. Calling this more than once has no effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The teardown may re-enter this subscription's owner, so it runs
        // after the lock is released.
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

enum Slot {
    Empty,
    Set(Subscription),
    Disposed,
}

/// Single-assignment holder for a subscription.
///
/// Operators subscribe upstream while their own subscription is being
/// built, so the upstream handle can arrive after the operator was disposed
/// (for example when the upstream fails synchronously). A late arrival is
/// disposed on the spot.
pub struct SubscriptionSlot {
    slot: Mutex<Slot>,
}

impl Default for SubscriptionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Stores `subscription`, replacing (and disposing) any previous one.
    ///
    /// Disposes `subscription` immediately if the slot was disposed.
    pub fn set(&self, subscription: Subscription) {
        let replaced = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Disposed => Some(subscription),
                _ => match std::mem::replace(&mut *slot, Slot::Set(subscription)) {
                    Slot::Set(previous) => Some(previous),
                    _ => None,
                },
            }
        };
        drop(replaced);
    }

    /// Returns true once the slot has been disposed.
    pub fn is_disposed(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Disposed)
    }

    /// Disposes the held subscription and every later arrival.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Disposed);
        if let Slot::Set(subscription) = previous {
            subscription.dispose();
        }
    }
}

/// Tracks the observers of a multicast source.
pub struct SubscriptionManager<T> {
    /// Registered observers in subscription order
    observers: BTreeMap<SubscriptionId, Arc<dyn Observer<T>>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionManager<T> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            observers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers `observer`, returning the ID to unsubscribe it with.
    pub fn subscribe(&mut self, observer: Arc<dyn Observer<T>>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.insert(id, observer);
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the observer was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Returns the registered observers in subscription order.
    ///
    /// Callers notify the snapshot after releasing whatever lock guards the
    /// manager, so an observer may unsubscribe while being notified.
    pub fn snapshot(&self) -> Vec<Arc<dyn Observer<T>>> {
        self.observers.values().cloned().collect()
    }

    /// Removes every observer, returning them in subscription order.
    pub fn drain(&mut self) -> Vec<Arc<dyn Observer<T>>> {
        std::mem::take(&mut self.observers).into_values().collect()
    }

    /// Returns the number of registered observers.
    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if there are no observers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
