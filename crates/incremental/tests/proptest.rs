//! Property-based tests for ripple-incremental using proptest.

use proptest::prelude::*;
use ripple_core::{ChangeReason, ChangeSet};
use ripple_incremental::{BoundedList, KeyedFilter, SnapshotDiffer, ValueEquality};
use std::collections::{HashMap, HashSet};

/// Replays a keyed change set onto a map.
fn replay(view: &mut HashMap<u8, (u8, i32)>, changes: &ChangeSet<(u8, i32), u8>) {
    for change in changes {
        match change.reason {
            ChangeReason::Add | ChangeReason::Update | ChangeReason::Refresh => {
                view.insert(change.key, change.current);
            }
            ChangeReason::Remove | ChangeReason::Clear => {
                view.remove(&change.key);
            }
            ChangeReason::Moved => {}
        }
    }
}

fn snapshot() -> impl Strategy<Value = Vec<(u8, i32)>> {
    prop::collection::vec((0u8..32, -5i32..5), 0..40)
}

proptest! {
    /// Replaying every diff onto the previous view yields the new snapshot.
    #[test]
    fn diff_replay_reaches_snapshot(snapshots in prop::collection::vec(snapshot(), 1..8)) {
        let mut differ = SnapshotDiffer::new();
        let mut view = HashMap::new();

        for snapshot in snapshots {
            let expected: HashMap<u8, (u8, i32)> = snapshot.iter().map(|item| (item.0, *item)).collect();
            let changes = differ.diff(snapshot, &|item: &(u8, i32)| item.0, &ValueEquality).unwrap();
            replay(&mut view, &changes);
            prop_assert_eq!(&view, &expected);
        }
    }

    /// A diff touches each key at most once.
    #[test]
    fn diff_keys_are_unique(before in snapshot(), after in snapshot()) {
        let mut differ = SnapshotDiffer::new();
        differ.diff(before, &|item: &(u8, i32)| item.0, &ValueEquality).unwrap();
        let changes = differ.diff(after, &|item: &(u8, i32)| item.0, &ValueEquality).unwrap();

        let keys: HashSet<u8> = changes.iter().map(|c| c.key).collect();
        prop_assert_eq!(keys.len(), changes.len());
    }

    /// The list never exceeds its limit, and replaying the indexed changes
    /// reproduces its contents.
    #[test]
    fn bounded_list_replay_and_limit(
        limit in 0usize..6,
        batches in prop::collection::vec(prop::collection::vec(any::<i16>(), 0..8), 1..10),
        removals in prop::collection::vec(0u64..60, 0..10),
    ) {
        let mut list = BoundedList::new(limit);
        let mut mirror: Vec<i16> = Vec::new();

        for batch in batches {
            let changes = list.append(batch);
            for change in &changes {
                let index = change.current_index.unwrap();
                match change.reason {
                    ChangeReason::Add => mirror.insert(index, change.current),
                    ChangeReason::Remove => { mirror.remove(index); }
                    _ => prop_assert!(false, "unexpected reason {:?}", change.reason),
                }
            }
            if limit > 0 {
                prop_assert!(list.len() <= limit);
            }
            prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), mirror.clone());
        }

        let changes = list.remove_many(&removals);
        for change in &changes {
            mirror.remove(change.current_index.unwrap());
        }
        prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), mirror);
    }

    /// The filtered view always equals the upstream view restricted to the predicate.
    #[test]
    fn keyed_filter_matches_predicate(snapshots in prop::collection::vec(snapshot(), 1..8)) {
        let predicate = |item: &(u8, i32)| item.1 >= 0;
        let mut differ = SnapshotDiffer::new();
        let mut filter = KeyedFilter::new(predicate);
        let mut upstream = HashMap::new();
        let mut filtered = HashMap::new();

        for snapshot in snapshots {
            let changes = differ.diff(snapshot, &|item: &(u8, i32)| item.0, &ValueEquality).unwrap();
            replay(&mut upstream, &changes);
            replay(&mut filtered, &filter.apply(&changes));

            let expected: HashMap<u8, (u8, i32)> = upstream
                .iter()
                .filter(|(_, item)| predicate(item))
                .map(|(key, item)| (*key, *item))
                .collect();
            prop_assert_eq!(&filtered, &expected);
        }
    }
}
