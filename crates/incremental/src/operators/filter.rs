//! Keyed filter operator.

use crate::refresh::RefreshAware;
use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::{HashMap, HashSet};
use ripple_core::{Change, ChangeReason, ChangeSet};

/// Maintains the subset of a keyed collection that satisfies a predicate.
///
/// The operator remembers which keys it has emitted, so an Update that
/// flips the predicate becomes an Add or a Remove downstream.
///
/// ```rust
/// use ripple_core::{Change, ChangeSet};
/// use ripple_incremental::KeyedFilter;
///
/// let mut evens = KeyedFilter::new(|x: &i32| x % 2 == 0);
/// let out = evens.apply(&ChangeSet::new(vec![Change::add(1, 2), Change::add(2, 3)]));
/// assert_eq!(out.as_slice(), &[Change::add(1, 2)]);
///
/// let out = evens.apply(&ChangeSet::new(vec![Change::update(1, 5, 2)]));
/// assert_eq!(out.as_slice(), &[Change::remove(1, 2)]);
/// ```
pub struct KeyedFilter<T, K, P> {
    predicate: P,
    /// Items currently passed downstream
    included: HashMap<K, T>,
    /// Keys present upstream, passing or not
    known: HashSet<K>,
}

impl<T, K, P> KeyedFilter<T, K, P>
where
    T: Clone,
    K: Eq + Hash + Clone,
    P: Fn(&T) -> bool,
{
    /// Creates a filter with the given predicate.
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            included: HashMap::new(),
            known: HashSet::new(),
        }
    }

    /// Returns the number of items passed downstream.
    #[inline]
    pub fn len(&self) -> usize {
        self.included.len()
    }

    /// Returns true if nothing is passed downstream.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    /// Returns true if `key` is passed downstream.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.included.contains_key(key)
    }

    /// Applies an upstream change set, returning the downstream changes.
    ///
    /// Moves are dropped: the filtered output is keyed, not ordered.
    pub fn apply(&mut self, changes: &ChangeSet<T, K>) -> ChangeSet<T, K> {
        let mut out = Vec::new();
        for change in changes {
            let emitted = match change.reason {
                ChangeReason::Add | ChangeReason::Update => {
                    self.known.insert(change.key.clone());
                    self.upsert(&change.key, &change.current)
                }
                ChangeReason::Remove | ChangeReason::Clear => {
                    self.known.remove(&change.key);
                    self.included
                        .remove(&change.key)
                        .map(|previous| Change::remove(change.key.clone(), previous))
                }
                ChangeReason::Refresh => self.on_refresh(&change.key, &change.current),
                ChangeReason::Moved => None,
            };
            out.extend(emitted);
        }
        ChangeSet::new(out)
    }

    fn upsert(&mut self, key: &K, current: &T) -> Option<Change<T, K>> {
        if (self.predicate)(current) {
            match self.included.insert(key.clone(), current.clone()) {
                Some(previous) => Some(Change::update(key.clone(), current.clone(), previous)),
                None => Some(Change::add(key.clone(), current.clone())),
            }
        } else {
            self.included
                .remove(key)
                .map(|previous| Change::remove(key.clone(), previous))
        }
    }
}

impl<T, K, P> RefreshAware<T, K> for KeyedFilter<T, K, P>
where
    T: Clone,
    K: Eq + Hash + Clone,
    P: Fn(&T) -> bool,
{
    type Output = T;

    fn on_refresh(&mut self, key: &K, current: &T) -> Option<Change<T, K>> {
        if !self.known.contains(key) {
            return None;
        }
        let passes = (self.predicate)(current);
        match (passes, self.included.contains_key(key)) {
            (true, true) => {
                self.included.insert(key.clone(), current.clone());
                Some(Change::refresh(key.clone(), current.clone()))
            }
            (true, false) => {
                self.included.insert(key.clone(), current.clone());
                Some(Change::add(key.clone(), current.clone()))
            }
            (false, true) => self
                .included
                .remove(key)
                .map(|previous| Change::remove(key.clone(), previous)),
            (false, false) => None,
        }
    }
}
