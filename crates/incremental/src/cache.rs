//! Change-aware keyed cache.
//!
//! A `ChangeAwareCache` is a keyed store that records every edit as a
//! [`Change`], so the caller can freeze the edits into a [`ChangeSet`] once
//! a batch is complete.

use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::HashMap;
use ripple_core::{Change, ChangeReason, ChangeSet};

/// A keyed store that records the changes made to it.
#[derive(Clone, Debug)]
pub struct ChangeAwareCache<T, K> {
    /// Current items by key
    data: HashMap<K, T>,
    /// Changes recorded since the last capture
    changes: Vec<Change<T, K>>,
}

impl<T, K> Default for ChangeAwareCache<T, K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K> ChangeAwareCache<T, K>
where
    K: Eq + Hash,
{
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            changes: Vec::new(),
        }
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the cache holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the item stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&T> {
        self.data.get(key)
    }

    /// Returns true if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.data.keys()
    }

    /// Returns an iterator over all items.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.data.values()
    }

    /// Returns an iterator over all key/item pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.data.iter()
    }

    /// Returns true if changes were recorded since the last capture.
    #[inline]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Takes the recorded changes as a change set.
    pub fn capture_changes(&mut self) -> ChangeSet<T, K> {
        ChangeSet::new(core::mem::take(&mut self.changes))
    }
}

impl<T, K> ChangeAwareCache<T, K>
where
    T: Clone,
    K: Eq + Hash + Clone,
{
    /// Inserts or replaces the item under `key`, recording an Add or Update.
    pub fn add_or_update(&mut self, item: T, key: K) {
        match self.data.insert(key.clone(), item.clone()) {
            Some(previous) => self.changes.push(Change::update(key, item, previous)),
            None => self.changes.push(Change::add(key, item)),
        }
    }

    /// Removes the item under `key`, recording a Remove if it was present.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        let removed = self.data.remove(key)?;
        self.changes.push(Change::remove(key.clone(), removed.clone()));
        Some(removed)
    }

    /// Records a Refresh for the item under `key`, if present.
    pub fn refresh(&mut self, key: &K) -> bool {
        match self.data.get(key) {
            Some(item) => {
                self.changes.push(Change::refresh(key.clone(), item.clone()));
                true
            }
            None => false,
        }
    }

    /// Replaces the item under `key` without changing membership, recording a Refresh.
    ///
    /// Does nothing when `key` is absent.
    pub fn refresh_with(&mut self, key: &K, item: T) -> bool {
        match self.data.get_mut(key) {
            Some(slot) => {
                *slot = item.clone();
                self.changes.push(Change::refresh(key.clone(), item));
                true
            }
            None => false,
        }
    }

    /// Removes every item, recording a Clear for each.
    pub fn clear(&mut self) {
        for (key, item) in self.data.drain() {
            self.changes.push(Change::clear(key, item));
        }
    }

    /// Replays an upstream change set onto this cache.
    ///
    /// The applied edits are recorded, so the cache can act as a mirror of
    /// the upstream collection.
    pub fn clone_changes(&mut self, changes: &ChangeSet<T, K>) {
        for change in changes {
            match change.reason {
                ChangeReason::Add | ChangeReason::Update => {
                    self.add_or_update(change.current.clone(), change.key.clone());
                }
                ChangeReason::Remove | ChangeReason::Clear => {
                    self.remove(&change.key);
                }
                ChangeReason::Refresh => {
                    self.refresh_with(&change.key, change.current.clone());
                }
                ChangeReason::Moved => {}
            }
        }
    }
}
