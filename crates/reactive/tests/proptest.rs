//! Property-based tests for ripple-reactive using proptest.

use proptest::prelude::*;
use ripple_reactive::{
    Change, ChangeSet, ChangeSetAggregator, ChangeSetStreamExt, FilterOptions, IngestOptions,
    SnapshotExt, Subject, VirtualScheduler,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
enum Op {
    /// Add or replace the item under a key
    Upsert(u8),
    Remove(u8),
    /// Push a boolean into a key's signal
    Signal(u8, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Upsert),
        (0u8..6).prop_map(Op::Remove),
        (0u8..6, any::<bool>()).prop_map(|(k, b)| Op::Signal(k, b)),
    ]
}

proptest! {
    /// The filtered view always holds exactly the present items whose
    /// latest boolean is true.
    #[test]
    fn filter_view_matches_latest_booleans(ops in prop::collection::vec(op(), 1..60)) {
        let signals: Vec<Subject<bool>> = (0..6).map(|_| Subject::new()).collect();
        let per_item = signals.clone();
        let items = Subject::<ChangeSet<u32, u8>>::new();
        let filtered = items
            .clone()
            .filter_on_observable(move |_: &u32, key: &u8| per_item[*key as usize].clone(), FilterOptions::immediate())
            .unwrap();
        let results = ChangeSetAggregator::new(&filtered);

        // Model: present items and the latest boolean seen since each was (re)subscribed.
        let mut present: BTreeMap<u8, u32> = BTreeMap::new();
        let mut latest: BTreeMap<u8, bool> = BTreeMap::new();
        let mut version = 0u32;

        for op in ops {
            match op {
                Op::Upsert(key) => {
                    version += 1;
                    let change = match present.insert(key, version) {
                        Some(previous) => Change::update(key, version, previous),
                        None => Change::add(key, version),
                    };
                    latest.remove(&key);
                    items.on_next(ChangeSet::new(vec![change]));
                }
                Op::Remove(key) => {
                    if let Some(previous) = present.remove(&key) {
                        latest.remove(&key);
                        items.on_next(ChangeSet::new(vec![Change::remove(key, previous)]));
                    }
                }
                Op::Signal(key, value) => {
                    if present.contains_key(&key) {
                        latest.insert(key, value);
                    }
                    signals[key as usize].on_next(value);
                }
            }

            let expected: BTreeSet<u32> = present
                .iter()
                .filter(|(key, _)| latest.get(key).copied().unwrap_or(false))
                .map(|(_, version)| *version)
                .collect();
            let actual: BTreeSet<u32> = results.items().into_iter().collect();
            prop_assert_eq!(actual, expected);
        }
    }

    /// The ingested list never exceeds its limit and keeps the newest items.
    #[test]
    fn ingestion_keeps_newest_within_limit(
        limit in 1usize..6,
        batches in prop::collection::vec(prop::collection::vec(any::<i16>(), 0..8), 1..10),
    ) {
        let source = Subject::<Vec<i16>>::new();
        let list = source
            .clone()
            .to_observable_change_set(IngestOptions::new(VirtualScheduler::new()).limit_size_to(limit));
        let results = ChangeSetAggregator::new(&list);

        let mut all = Vec::new();
        for batch in batches {
            all.extend(batch.iter().copied());
            source.on_next(batch);
            prop_assert!(results.len() <= limit);
        }

        let mut expected: Vec<i16> = all.iter().rev().take(limit).copied().collect();
        expected.sort_unstable();
        let mut actual = results.items();
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);
    }
}
