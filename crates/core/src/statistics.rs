//! Running statistics over a stream of change sets.

use crate::change_set::ChangeSet;

/// Counts for one change set, or accumulated over many.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeStatistics {
    /// Position of the change set in the stream (1-based, 0 when nothing was seen)
    pub index: usize,
    pub adds: usize,
    pub updates: usize,
    pub removes: usize,
    pub refreshes: usize,
    pub moves: usize,
    /// Size of the materialized collection after the change set
    pub count: usize,
}

impl ChangeStatistics {
    /// Computes the statistics for a single change set.
    pub fn of<T, K>(index: usize, changes: &ChangeSet<T, K>, count: usize) -> Self {
        Self {
            index,
            adds: changes.adds(),
            updates: changes.updates(),
            removes: changes.removes(),
            refreshes: changes.refreshes(),
            moves: changes.moves(),
            count,
        }
    }

    /// Total number of changes counted.
    #[inline]
    pub fn total(&self) -> usize {
        self.adds + self.updates + self.removes + self.refreshes + self.moves
    }
}

/// Statistics for the latest change set and for the whole stream so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub latest: ChangeStatistics,
    pub overall: ChangeStatistics,
}

impl ChangeSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds another change set into the summary.
    ///
    /// `count` is the size of the materialized collection after applying it.
    pub fn record<T, K>(&mut self, changes: &ChangeSet<T, K>, count: usize) {
        let index = self.latest.index + 1;
        let latest = ChangeStatistics::of(index, changes, count);
        self.overall = ChangeStatistics {
            index,
            adds: self.overall.adds + latest.adds,
            updates: self.overall.updates + latest.updates,
            removes: self.overall.removes + latest.removes,
            refreshes: self.overall.refreshes + latest.refreshes,
            moves: self.overall.moves + latest.moves,
            count,
        };
        self.latest = latest;
    }
}
