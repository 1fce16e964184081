//! Keyed transform operator.

use crate::refresh::RefreshAware;
use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::HashMap;
use ripple_core::{Change, ChangeReason, ChangeSet};

/// Projects every item of a keyed collection through a function.
///
/// Projections are cached per key so removals carry the value downstream
/// actually holds. Indexes are preserved.
pub struct KeyedTransform<T, U, K, F> {
    transform: F,
    projected: HashMap<K, U>,
    _source: core::marker::PhantomData<fn(&T)>,
}

impl<T, U, K, F> KeyedTransform<T, U, K, F>
where
    U: Clone,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> U,
{
    /// Creates a transform with the given projection.
    pub fn new(transform: F) -> Self {
        Self {
            transform,
            projected: HashMap::new(),
            _source: core::marker::PhantomData,
        }
    }

    /// Returns the number of projected items.
    #[inline]
    pub fn len(&self) -> usize {
        self.projected.len()
    }

    /// Returns true if nothing is projected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.projected.is_empty()
    }

    /// Returns the projection stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&U> {
        self.projected.get(key)
    }

    /// Applies an upstream change set, returning the projected changes.
    pub fn apply(&mut self, changes: &ChangeSet<T, K>) -> ChangeSet<U, K> {
        let mut out = Vec::with_capacity(changes.len());
        for change in changes {
            let key = &change.key;
            let emitted = match change.reason {
                ChangeReason::Add | ChangeReason::Update => {
                    let current = (self.transform)(&change.current);
                    let mut projected = match self.projected.insert(key.clone(), current.clone()) {
                        Some(previous) => Change::update(key.clone(), current, previous),
                        None => Change::add(key.clone(), current),
                    };
                    projected.current_index = change.current_index;
                    projected.previous_index = change.previous_index;
                    Some(projected)
                }
                ChangeReason::Remove | ChangeReason::Clear => {
                    self.projected.remove(key).map(|previous| Change {
                        reason: change.reason,
                        key: key.clone(),
                        current: previous,
                        previous: None,
                        current_index: change.current_index,
                        previous_index: change.previous_index,
                    })
                }
                ChangeReason::Refresh => self.on_refresh(key, &change.current),
                ChangeReason::Moved => self.projected.get(key).map(|current| Change {
                    reason: ChangeReason::Moved,
                    key: key.clone(),
                    current: current.clone(),
                    previous: None,
                    current_index: change.current_index,
                    previous_index: change.previous_index,
                }),
            };
            out.extend(emitted);
        }
        ChangeSet::new(out)
    }
}

impl<T, U, K, F> RefreshAware<T, K> for KeyedTransform<T, U, K, F>
where
    U: Clone,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> U,
{
    type Output = U;

    /// Re-projects the item. A projection never changes membership, so the
    /// result is always a Refresh for a known key.
    fn on_refresh(&mut self, key: &K, current: &T) -> Option<Change<U, K>> {
        let slot = self.projected.get_mut(key)?;
        *slot = (self.transform)(current);
        Some(Change::refresh(key.clone(), slot.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec;

    fn label(x: &i32) -> String {
        format!("#{x}")
    }

    #[test]
    fn test_transform_add_update_remove() {
        let mut transform = KeyedTransform::new(label);

        let out = transform.apply(&ChangeSet::new(vec![Change::add(1, 5).with_index(0)]));
        assert_eq!(out[0], Change::add(1, String::from("#5")).with_index(0));

        let out = transform.apply(&ChangeSet::new(vec![Change::update(1, 6, 5)]));
        assert_eq!(
            out[0],
            Change::update(1, String::from("#6"), String::from("#5"))
        );

        let out = transform.apply(&ChangeSet::new(vec![Change::remove(1, 6)]));
        assert_eq!(out[0], Change::remove(1, String::from("#6")));
        assert!(transform.is_empty());
    }

    #[test]
    fn test_transform_remove_unknown_key() {
        let mut transform = KeyedTransform::new(label);
        let out = transform.apply(&ChangeSet::new(vec![Change::remove(1, 6)]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_transform_refresh_reprojects() {
        let mut transform = KeyedTransform::new(label);
        transform.apply(&ChangeSet::new(vec![Change::add(1, 5)]));

        let out = transform.apply(&ChangeSet::new(vec![
            Change::refresh(1, 8),
            Change::refresh(2, 9),
        ]));
        assert_eq!(out.as_slice(), &[Change::refresh(1, String::from("#8"))]);
        assert_eq!(transform.get(&1).map(String::as_str), Some("#8"));
    }

    #[test]
    fn test_transform_preserves_move_indexes() {
        let mut transform = KeyedTransform::new(label);
        transform.apply(&ChangeSet::new(vec![Change::add(1, 5)]));
        let out = transform.apply(&ChangeSet::new(vec![Change::moved(1, 5, 2, 0)]));
        assert_eq!(out[0], Change::moved(1, String::from("#5"), 2, 0));
    }
}
