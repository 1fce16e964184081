//! Snapshot diffing.
//!
//! `SnapshotDiffer` turns a sequence of full snapshots into the minimal
//! change sets that move a keyed collection from one snapshot to the next.
//! Every snapshot produces exactly one change set, which may be empty.

use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::HashMap;
use ripple_core::{Change, ChangeSet, Result};

/// Produces the key of an item.
///
/// Any `Fn(&T) -> K` is an infallible key selector. Wrap a
/// `Fn(&T) -> Result<K>` in [`TryKey`] for selectors that can fail.
pub trait KeySelector<T, K> {
    /// Returns the key of `item`.
    fn select(&self, item: &T) -> Result<K>;
}

impl<T, K, F> KeySelector<T, K> for F
where
    F: Fn(&T) -> K,
{
    #[inline]
    fn select(&self, item: &T) -> Result<K> {
        Ok(self(item))
    }
}

/// A fallible key selector.
///
/// ```rust
/// use ripple_core::Error;
/// use ripple_incremental::{KeySelector, TryKey};
///
/// let selector = TryKey(|s: &&str| s.parse::<u32>().map_err(|e| Error::key_selector(e.to_string())));
/// assert_eq!(selector.select(&"42").unwrap(), 42);
/// assert!(selector.select(&"x").is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TryKey<F>(pub F);

impl<T, K, F> KeySelector<T, K> for TryKey<F>
where
    F: Fn(&T) -> Result<K>,
{
    #[inline]
    fn select(&self, item: &T) -> Result<K> {
        (self.0)(item)
    }
}

/// Decides whether two items with the same key are equal.
///
/// Any `Fn(&T, &T) -> bool` is a comparer; [`ValueEquality`] uses `PartialEq`.
pub trait Equality<T> {
    /// Returns true if `a` and `b` are equal.
    fn equals(&self, a: &T, b: &T) -> bool;
}

impl<T, F> Equality<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// Equality by `PartialEq`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueEquality;

impl<T: PartialEq> Equality<T> for ValueEquality {
    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// Diffs successive snapshots of a keyed collection.
#[derive(Clone, Debug)]
pub struct SnapshotDiffer<T, K> {
    /// Items of the previous snapshot by key
    previous: HashMap<K, T>,
    /// Keys of the previous snapshot in first-seen order
    order: Vec<K>,
}

impl<T, K> Default for SnapshotDiffer<T, K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K> SnapshotDiffer<T, K>
where
    K: Eq + Hash,
{
    /// Creates a differ whose previous snapshot is empty.
    pub fn new() -> Self {
        Self {
            previous: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the number of keys in the previous snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    /// Returns true if the previous snapshot was empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Returns the item of the previous snapshot stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&T> {
        self.previous.get(key)
    }
}

impl<T, K> SnapshotDiffer<T, K>
where
    T: Clone,
    K: Eq + Hash + Clone,
{
    /// Computes the change set from the previous snapshot to `snapshot`.
    ///
    /// Duplicate keys within `snapshot` are resolved last-item-wins. Adds
    /// and updates follow the order in which keys first appear in the new
    /// snapshot; removes follow the order of the previous snapshot.
    ///
    /// If the key selector fails, the error is returned and the previous
    /// snapshot is kept.
    pub fn diff<I, S, E>(
        &mut self,
        snapshot: I,
        selector: &S,
        equality: &E,
    ) -> Result<ChangeSet<T, K>>
    where
        I: IntoIterator<Item = T>,
        S: KeySelector<T, K> + ?Sized,
        E: Equality<T> + ?Sized,
    {
        let snapshot = snapshot.into_iter();
        let mut current: HashMap<K, T> = HashMap::with_capacity(snapshot.size_hint().0);
        let mut order = Vec::with_capacity(snapshot.size_hint().0);

        for item in snapshot {
            let key = selector.select(&item)?;
            if current.insert(key.clone(), item).is_none() {
                order.push(key);
            }
        }

        let mut changes = Vec::new();
        for key in &order {
            let Some(item) = current.get(key) else { continue };
            match self.previous.get(key) {
                None => changes.push(Change::add(key.clone(), item.clone())),
                Some(previous) if !equality.equals(previous, item) => {
                    changes.push(Change::update(key.clone(), item.clone(), previous.clone()));
                }
                Some(_) => {}
            }
        }

        for key in &self.order {
            if current.contains_key(key) {
                continue;
            }
            if let Some(previous) = self.previous.get(key) {
                changes.push(Change::remove(key.clone(), previous.clone()));
            }
        }

        self.previous = current;
        self.order = order;

        Ok(ChangeSet::new(changes))
    }
}
