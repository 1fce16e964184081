//! Bounded, append-only materialized list.
//!
//! Items are appended in arrival order and identified by an [`ItemId`]
//! assigned on arrival. When the list grows past its limit the oldest items
//! are evicted first. Removal by id checks membership, so an item that was
//! already evicted is silently skipped.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use ripple_core::{Change, ChangeSet};

/// Identity of an item appended to a [`BoundedList`].
///
/// Ids are assigned in strictly increasing order, so the list is always
/// sorted by id.
pub type ItemId = u64;

/// An ordered list with an optional size limit.
#[derive(Clone, Debug)]
pub struct BoundedList<T> {
    items: VecDeque<(ItemId, T)>,
    /// Maximum length, 0 = unlimited
    limit: usize,
    next_id: ItemId,
}

impl<T> Default for BoundedList<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> BoundedList<T> {
    /// Creates a list holding at most `limit` items (0 = unlimited).
    pub fn new(limit: usize) -> Self {
        Self {
            items: VecDeque::new(),
            limit,
            next_id: 0,
        }
    }

    /// Returns the size limit (0 = unlimited).
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the current position of `id`, if it is still present.
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |(item_id, _)| *item_id).ok()
    }

    /// Returns true if `id` is still present.
    #[inline]
    pub fn contains(&self, id: ItemId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the item with the given id.
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.position(id).map(|pos| &self.items[pos].1)
    }

    /// Returns an iterator over the items in list order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|(_, item)| item)
    }

}

impl<T: Clone> BoundedList<T> {
    /// Appends a batch, evicting the oldest items past the limit.
    ///
    /// The returned change set holds one Add per appended item followed by
    /// one Remove per evicted item. Each change carries the index it applies
    /// to when the change set is replayed in order.
    pub fn append(&mut self, batch: impl IntoIterator<Item = T>) -> ChangeSet<T, ItemId> {
        let mut changes = Vec::new();

        for item in batch {
            let id = self.next_id;
            self.next_id += 1;
            changes.push(Change::add(id, item.clone()).with_index(self.items.len()));
            self.items.push_back((id, item));
        }

        if self.limit > 0 {
            while self.items.len() > self.limit {
                if let Some((id, item)) = self.items.pop_front() {
                    changes.push(Change::remove(id, item).with_index(0));
                }
            }
        }

        ChangeSet::new(changes)
    }

    /// Removes every listed id that is still present.
    ///
    /// Removals are emitted in list order; ids that are no longer present
    /// produce nothing.
    pub fn remove_many(&mut self, ids: &[ItemId]) -> ChangeSet<T, ItemId> {
        let mut targets: Vec<ItemId> =
            ids.iter().copied().filter(|id| self.contains(*id)).collect();
        if targets.is_empty() {
            return ChangeSet::default();
        }
        targets.sort_unstable();
        targets.dedup();

        let mut changes = Vec::with_capacity(targets.len());
        let mut kept = VecDeque::with_capacity(self.items.len() - targets.len());
        let mut targets = targets.into_iter().peekable();
        for (position, (id, item)) in self.items.drain(..).enumerate() {
            if targets.next_if_eq(&id).is_some() {
                // Index as seen after the earlier removals were applied
                let index = position - changes.len();
                changes.push(Change::remove(id, item).with_index(index));
            } else {
                kept.push_back((id, item));
            }
        }
        self.items = kept;

        ChangeSet::new(changes)
    }

    /// Removes every item, returning one Clear per item.
    pub fn clear(&mut self) -> ChangeSet<T, ItemId> {
        self.items
            .drain(..)
            .enumerate()
            .map(|(n, (id, item))| Change::clear(id, item).with_index(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use ripple_core::ChangeReason;

    #[test]
    fn test_append_unlimited() {
        let mut list = BoundedList::new(0);
        let cs = list.append(vec!['a', 'b']);
        assert_eq!(cs.adds(), 2);
        assert_eq!(cs[0], Change::add(0, 'a').with_index(0));
        assert_eq!(cs[1], Change::add(1, 'b').with_index(1));

        let cs = list.append(vec!['c']);
        assert_eq!(cs[0], Change::add(2, 'c').with_index(2));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_append_evicts_oldest() {
        let mut list = BoundedList::new(3);
        let cs = list.append(vec!['a', 'b', 'c']);
        assert_eq!(cs.adds(), 3);
        assert_eq!(cs.removes(), 0);

        let cs = list.append(vec!['d']);
        assert_eq!(
            cs.as_slice(),
            &[
                Change::add(3, 'd').with_index(3),
                Change::remove(0, 'a').with_index(0),
            ]
        );
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec!['b', 'c', 'd']);
    }

    #[test]
    fn test_append_batch_larger_than_limit() {
        let mut list = BoundedList::new(2);
        let cs = list.append(vec![1, 2, 3, 4, 5]);

        assert_eq!(cs.adds(), 5);
        assert_eq!(cs.removes(), 3);
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn test_append_empty_batch() {
        let mut list: BoundedList<i32> = BoundedList::new(2);
        assert!(list.append(Vec::new()).is_empty());
    }

    #[test]
    fn test_remove_many_skips_absent() {
        let mut list = BoundedList::new(0);
        list.append(vec!['a', 'b', 'c', 'd']);

        let cs = list.remove_many(&[3, 1, 42, 1]);
        assert_eq!(
            cs.as_slice(),
            &[
                Change::remove(1, 'b').with_index(1),
                Change::remove(3, 'd').with_index(2),
            ]
        );
        assert!(list.contains(0));
        assert!(!list.contains(1));
        assert_eq!(list.get(2), Some(&'c'));

        assert!(list.remove_many(&[1, 3]).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut list = BoundedList::new(0);
        list.append(vec![1, 2]);
        let cs = list.clear();
        assert_eq!(cs.len(), 2);
        assert!(cs.iter().all(|c| c.reason == ChangeReason::Clear));
        assert!(list.is_empty());
    }
}
