//! Method-call entry points for the change-set operators.

use crate::auto_refresh::{AutoRefreshOnObservable, RefreshOptions};
use crate::edit_diff::EditDiff;
use crate::filter_on_observable::{FilterOnObservable, FilterOptions};
use crate::ingest::{IngestOptions, ToObservableChangeSet};
use crate::keyed::{Filter, Transform};
use crate::observable::Observable;
use ripple_core::{ChangeSet, Result};
use ripple_incremental::{KeySelector, ValueEquality};

/// Operators on streams of full snapshots.
pub trait SnapshotExt<T>: Observable<Vec<T>> + Sized {
    /// Diffs consecutive snapshots into change sets keyed by `selector`.
    fn edit_diff<K, Sel>(self, selector: Sel) -> EditDiff<Self, T, K, Sel, ValueEquality>
    where
        Sel: KeySelector<T, K>,
    {
        EditDiff::new(self, selector)
    }

    /// Appends every snapshot as a batch to a bounded, expiring list.
    fn to_observable_change_set(self, options: IngestOptions<T>) -> ToObservableChangeSet<Self, T> {
        ToObservableChangeSet::new(self, options)
    }
}

impl<T, O: Observable<Vec<T>>> SnapshotExt<T> for O {}

/// Operators on change-set streams.
pub trait ChangeSetStreamExt<T, K>: Observable<ChangeSet<T, K>> + Sized {
    /// See [`FilterOnObservable`].
    fn filter_on_observable<F, O>(
        self,
        factory: F,
        options: FilterOptions,
    ) -> Result<FilterOnObservable<Self, F, T, K>>
    where
        F: Fn(&T, &K) -> O,
        O: Observable<bool>,
    {
        FilterOnObservable::new(self, factory, options)
    }

    /// See [`AutoRefreshOnObservable`].
    fn auto_refresh_on_observable<F, O, X>(
        self,
        factory: F,
        options: RefreshOptions,
    ) -> Result<AutoRefreshOnObservable<Self, F, T, K, X>>
    where
        F: Fn(&T, &K) -> O,
        O: Observable<X>,
    {
        AutoRefreshOnObservable::new(self, factory, options)
    }

    /// Keeps the items matching `predicate`.
    fn filter<P>(self, predicate: P) -> Filter<Self, P, T, K>
    where
        P: Fn(&T) -> bool,
    {
        Filter::new(self, predicate)
    }

    /// Projects every item with `transform`.
    fn transform<U, F>(self, transform: F) -> Transform<Self, F, T, U, K>
    where
        F: Fn(&T) -> U,
    {
        Transform::new(self, transform)
    }
}

impl<T, K, O: Observable<ChangeSet<T, K>>> ChangeSetStreamExt<T, K> for O {}
