//! A single structural change to a keyed collection.

/// The kind of structural mutation a [`Change`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// The key is new to the collection.
    Add,
    /// The key was present and its value was replaced.
    Update,
    /// The key left the collection.
    Remove,
    /// The value is unchanged but something derived from it must be re-evaluated.
    Refresh,
    /// The item changed position without changing value.
    Moved,
    /// The item was removed as part of clearing the whole collection.
    Clear,
}

impl ChangeReason {
    /// Returns true for reasons that take the key out of the collection.
    #[inline]
    pub fn is_removal(self) -> bool {
        matches!(self, ChangeReason::Remove | ChangeReason::Clear)
    }
}

/// A single change to a keyed collection.
///
/// `previous` is only set for updates; the indexes are only set by
/// operators that maintain an ordered materialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change<T, K> {
    /// What happened
    pub reason: ChangeReason,
    /// Identity of the affected item
    pub key: K,
    /// The item after the change (the removed item for removals)
    pub current: T,
    /// The item before an update
    pub previous: Option<T>,
    /// Position of the item after the change
    pub current_index: Option<usize>,
    /// Position of the item before a move
    pub previous_index: Option<usize>,
}

impl<T, K> Change<T, K> {
    /// Creates a change with the given reason and no previous value or indexes.
    #[inline]
    pub fn new(reason: ChangeReason, key: K, current: T) -> Self {
        Self {
            reason,
            key,
            current,
            previous: None,
            current_index: None,
            previous_index: None,
        }
    }

    /// Creates an addition.
    #[inline]
    pub fn add(key: K, current: T) -> Self {
        Self::new(ChangeReason::Add, key, current)
    }

    /// Creates an update from `previous` to `current`.
    #[inline]
    pub fn update(key: K, current: T, previous: T) -> Self {
        Self {
            previous: Some(previous),
            ..Self::new(ChangeReason::Update, key, current)
        }
    }

    /// Creates a removal of `current`.
    #[inline]
    pub fn remove(key: K, current: T) -> Self {
        Self::new(ChangeReason::Remove, key, current)
    }

    /// Creates a refresh of `current`.
    #[inline]
    pub fn refresh(key: K, current: T) -> Self {
        Self::new(ChangeReason::Refresh, key, current)
    }

    /// Creates a move from `previous_index` to `current_index`.
    #[inline]
    pub fn moved(key: K, current: T, current_index: usize, previous_index: usize) -> Self {
        Self {
            current_index: Some(current_index),
            previous_index: Some(previous_index),
            ..Self::new(ChangeReason::Moved, key, current)
        }
    }

    /// Creates a removal caused by clearing the collection.
    #[inline]
    pub fn clear(key: K, current: T) -> Self {
        Self::new(ChangeReason::Clear, key, current)
    }

    /// Sets the position of the item after the change.
    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.current_index = Some(index);
        self
    }

    /// Sets the position of the item before the change.
    #[inline]
    pub fn with_previous_index(mut self, index: usize) -> Self {
        self.previous_index = Some(index);
        self
    }

    /// Returns the reason of this change.
    #[inline]
    pub fn reason(&self) -> ChangeReason {
        self.reason
    }

    /// Returns a reference to the key.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns a reference to the current item.
    #[inline]
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Returns a reference to the previous item, if any.
    #[inline]
    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// Maps the items of this change to a new type, keeping key, reason and indexes.
    pub fn map<U, F>(self, mut f: F) -> Change<U, K>
    where
        F: FnMut(T) -> U,
    {
        Change {
            reason: self.reason,
            key: self.key,
            current: f(self.current),
            previous: self.previous.map(&mut f),
            current_index: self.current_index,
            previous_index: self.previous_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_add() {
        let c = Change::add(1, "a");
        assert_eq!(c.reason(), ChangeReason::Add);
        assert_eq!(*c.key(), 1);
        assert_eq!(*c.current(), "a");
        assert!(c.previous().is_none());
        assert!(c.current_index.is_none());
    }

    #[test]
    fn test_change_update() {
        let c = Change::update(1, "b", "a");
        assert_eq!(c.reason, ChangeReason::Update);
        assert_eq!(c.previous(), Some(&"a"));
    }

    #[test]
    fn test_change_moved() {
        let c = Change::moved(7, 'x', 0, 3);
        assert_eq!(c.current_index, Some(0));
        assert_eq!(c.previous_index, Some(3));
    }

    #[test]
    fn test_change_with_index() {
        let c = Change::remove(2, 20).with_index(4);
        assert_eq!(c.current_index, Some(4));
        assert!(c.reason.is_removal());
        assert!(ChangeReason::Clear.is_removal());
        assert!(!ChangeReason::Refresh.is_removal());
    }

    #[test]
    fn test_change_map() {
        let c = Change::update(1, 10, 5).with_index(2).map(|v| v * 2);
        assert_eq!(c.current, 20);
        assert_eq!(c.previous, Some(10));
        assert_eq!(c.current_index, Some(2));
    }
}
