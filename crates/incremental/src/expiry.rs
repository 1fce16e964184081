//! Expiry groups for time-limited items.
//!
//! Items are grouped by their absolute expiry time rounded down to the
//! millisecond, so items expiring together share one timer.

use crate::list::ItemId;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::time::Duration;
use hashbrown::{HashMap, HashSet};

/// Absolute expiry for an item inserted at `now` with time-to-live `ttl`,
/// rounded down to millisecond resolution.
pub fn expiry_at(now: Duration, ttl: Duration) -> Duration {
    let at = now.saturating_add(ttl);
    Duration::from_millis(u64::try_from(at.as_millis()).unwrap_or(u64::MAX))
}

/// Tracks which items expire at which (rounded) time.
#[derive(Clone, Debug, Default)]
pub struct ExpiryIndex {
    /// Expiry time -> members
    groups: BTreeMap<Duration, HashSet<ItemId>>,
    /// Member -> expiry time
    members: HashMap<ItemId, Duration>,
}

impl ExpiryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked items.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if nothing is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the number of distinct expiry groups.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the earliest pending expiry time.
    pub fn next_expiry(&self) -> Option<Duration> {
        self.groups.keys().next().copied()
    }

    /// Returns the expiry time of `id`.
    pub fn expiry_of(&self, id: ItemId) -> Option<Duration> {
        self.members.get(&id).copied()
    }

    /// Tracks `id` as expiring at `at`.
    ///
    /// Returns true if this created a new group, in which case the caller
    /// owes the group a timer.
    pub fn track(&mut self, id: ItemId, at: Duration) -> bool {
        if let Some(previous) = self.members.insert(id, at) {
            self.detach(id, previous);
        }
        let group = self.groups.entry(at).or_default();
        group.insert(id);
        group.len() == 1
    }

    /// Stops tracking `id`.
    ///
    /// Returns the group's expiry time if the group became empty and was
    /// dropped, in which case its timer can be cancelled.
    pub fn forget(&mut self, id: ItemId) -> Option<Duration> {
        let at = self.members.remove(&id)?;
        self.detach(id, at).then_some(at)
    }

    /// Removes the group expiring at `at`, returning its members in id order.
    pub fn take(&mut self, at: Duration) -> Vec<ItemId> {
        let Some(group) = self.groups.remove(&at) else {
            return Vec::new();
        };
        let mut members: Vec<ItemId> = group.into_iter().collect();
        members.sort_unstable();
        for id in &members {
            self.members.remove(id);
        }
        members
    }

    /// Drops every group, returning their expiry times.
    pub fn clear(&mut self) -> Vec<Duration> {
        self.members.clear();
        core::mem::take(&mut self.groups).into_keys().collect()
    }

    /// Removes `id` from the group at `at`; returns true if the group is now gone.
    fn detach(&mut self, id: ItemId, at: Duration) -> bool {
        let Some(group) = self.groups.get_mut(&at) else {
            return false;
        };
        group.remove(&id);
        if group.is_empty() {
            self.groups.remove(&at);
            true
        } else {
            false
        }
    }
}
