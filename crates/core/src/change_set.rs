//! Change set for tracking collection changes.
//!
//! A ChangeSet represents one atomic transition between two observed states
//! of a keyed collection. It is immutable once built: operators collect
//! changes into a `Vec` and freeze it with [`ChangeSet::new`].

use crate::change::{Change, ChangeReason};
use alloc::vec::Vec;
use core::ops::Deref;

/// An ordered, immutable batch of changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeSet<T, K> {
    changes: Vec<Change<T, K>>,
}

impl<T, K> Default for ChangeSet<T, K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, K> ChangeSet<T, K> {
    /// Creates a change set from an ordered list of changes.
    #[inline]
    pub fn new(changes: Vec<Change<T, K>>) -> Self {
        Self { changes }
    }

    /// Creates a change set with no changes.
    #[inline]
    pub fn empty() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    /// Creates a change set representing an initial load.
    ///
    /// Every item becomes an addition.
    pub fn initial(items: impl IntoIterator<Item = (K, T)>) -> Self {
        Self {
            changes: items
                .into_iter()
                .map(|(key, item)| Change::add(key, item))
                .collect(),
        }
    }

    /// Returns the number of changes with the given reason.
    pub fn count(&self, reason: ChangeReason) -> usize {
        self.changes.iter().filter(|c| c.reason == reason).count()
    }

    /// Returns the number of additions.
    #[inline]
    pub fn adds(&self) -> usize {
        self.count(ChangeReason::Add)
    }

    /// Returns the number of updates.
    #[inline]
    pub fn updates(&self) -> usize {
        self.count(ChangeReason::Update)
    }

    /// Returns the number of removals, including removals caused by a clear.
    #[inline]
    pub fn removes(&self) -> usize {
        self.changes.iter().filter(|c| c.reason.is_removal()).count()
    }

    /// Returns the number of refreshes.
    #[inline]
    pub fn refreshes(&self) -> usize {
        self.count(ChangeReason::Refresh)
    }

    /// Returns the number of moves.
    #[inline]
    pub fn moves(&self) -> usize {
        self.count(ChangeReason::Moved)
    }

    /// Returns the changes as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[Change<T, K>] {
        &self.changes
    }

    /// Consumes the change set, returning its changes.
    #[inline]
    pub fn into_vec(self) -> Vec<Change<T, K>> {
        self.changes
    }

    /// Maps every item in the change set, keeping keys, reasons and indexes.
    pub fn map<U, F>(self, mut f: F) -> ChangeSet<U, K>
    where
        F: FnMut(T) -> U,
    {
        ChangeSet {
            changes: self.changes.into_iter().map(|c| c.map(&mut f)).collect(),
        }
    }
}

impl<T, K> Deref for ChangeSet<T, K> {
    type Target = [Change<T, K>];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.changes
    }
}

impl<T, K> From<Vec<Change<T, K>>> for ChangeSet<T, K> {
    fn from(changes: Vec<Change<T, K>>) -> Self {
        Self::new(changes)
    }
}

impl<T, K> FromIterator<Change<T, K>> for ChangeSet<T, K> {
    fn from_iter<I: IntoIterator<Item = Change<T, K>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T, K> IntoIterator for ChangeSet<T, K> {
    type Item = Change<T, K>;
    type IntoIter = alloc::vec::IntoIter<Change<T, K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a, T, K> IntoIterator for &'a ChangeSet<T, K> {
    type Item = &'a Change<T, K>;
    type IntoIter = core::slice::Iter<'a, Change<T, K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
