//! Ripple Reactive - push-based change-set operators.
//!
//! This crate wires the state machines of `ripple-incremental` to a small
//! observable model. A source pushes values to its observers; operators
//! turn snapshots, batches or per-item signals into
//! [`ChangeSet`](ripple_core::ChangeSet)s describing how a keyed collection
//! changed.
//!
//! # Core Concepts
//!
//! - [`Observable`] / [`Observer`]: subscribe, then receive values followed
//!   by at most one completion or error
//! - [`Subscription`]: disposes on drop; disposing is idempotent
//! - [`Scheduler`]: injected time, virtual in tests and tokio at runtime
//!
//! # Operators
//!
//! - [`EditDiff`]: snapshot stream to change-set stream
//! - [`ToObservableChangeSet`]: bounded, time-expiring ingestion of batches
//! - [`FilterOnObservable`]: filtering driven by a boolean source per item
//! - [`AutoRefreshOnObservable`]: Refresh signals driven by a source per item
//! - [`Filter`] / [`Transform`]: keyed operators honoring Refresh
//! - [`select_parallel`]: bounded parallel map
//!
//! # Example
//!
//! ```rust
//! use ripple_core::Change;
//! use ripple_reactive::{ChangeSetAggregator, IngestOptions, SnapshotExt, Subject, VirtualScheduler};
//!
//! let scheduler = VirtualScheduler::new();
//! let batches = Subject::<Vec<&str>>::new();
//! let list = batches
//!     .clone()
//!     .to_observable_change_set(IngestOptions::new(scheduler).limit_size_to(3));
//! let results = ChangeSetAggregator::new(&list);
//!
//! batches.on_next(vec!["a", "b", "c"]);
//! batches.on_next(vec!["d"]);
//!
//! let messages = results.messages();
//! assert_eq!(messages[0].adds(), 3);
//! assert_eq!(
//!     messages[1].as_slice(),
//!     &[Change::add(3, "d").with_index(3), Change::remove(0, "a").with_index(0)]
//! );
//! assert_eq!(results.len(), 3);
//! ```

pub mod aggregator;
pub mod auto_refresh;
pub mod edit_diff;
pub mod ext;
pub mod filter_on_observable;
mod gate;
pub mod ingest;
pub mod keyed;
pub mod observable;
pub mod observer;
pub mod parallel;
pub mod scheduler;
pub mod source;
pub mod subject;
pub mod subscription;

pub use aggregator::ChangeSetAggregator;
pub use auto_refresh::{AutoRefreshOnObservable, RefreshOptions};
pub use edit_diff::EditDiff;
pub use ext::{ChangeSetStreamExt, SnapshotExt};
pub use filter_on_observable::{FilterOnObservable, FilterOptions};
pub use ingest::{IngestOptions, ToObservableChangeSet};
pub use keyed::{Filter, Transform};
pub use observable::{DistinctUntilChanged, Map, Observable, ObservableExt, SharedObservable};
pub use observer::{observer, observer_with, FnObserver, Observer, Sink};
pub use parallel::select_parallel;
pub use scheduler::{Scheduler, Task, TokioScheduler, VirtualScheduler};
pub use source::{
    as_observable_change_set, fail, from_iter, never, AsChangeSet, Fail, FromIter, Never,
};
pub use subject::Subject;
pub use subscription::{Subscription, SubscriptionId, SubscriptionManager, SubscriptionSlot};

// Re-export commonly used types from dependencies
pub use ripple_core::{
    Change, ChangeReason, ChangeSet, ChangeStatistics, ChangeSummary, Error, Result,
};
pub use ripple_incremental::{ItemId, KeySelector, TryKey};
