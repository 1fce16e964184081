//! Ripple Incremental - state machines behind Ripple's change-set operators.
//!
//! Everything in this crate is synchronous and free of I/O: each type takes
//! an input (a snapshot, a batch, an upstream change set) and returns the
//! [`ChangeSet`](ripple_core::ChangeSet) its downstream needs. The reactive
//! layer wires these machines to observers, timers and subscriptions.
//!
//! # Components
//!
//! - [`ChangeAwareCache`]: keyed store that records its own edits
//! - [`SnapshotDiffer`]: turns full snapshots into minimal change sets
//! - [`BoundedList`]: append-only list with oldest-first eviction
//! - [`ExpiryIndex`]: groups list items by (rounded) expiry time
//! - [`ProxyTable`]: per-item state for filters driven by per-item sources
//! - [`KeyedFilter`] / [`KeyedTransform`]: refresh-aware keyed operators
//!
//! # Example
//!
//! ```rust
//! use ripple_incremental::{SnapshotDiffer, ValueEquality};
//!
//! let mut differ = SnapshotDiffer::new();
//! let key = |s: &&str| s.len();
//!
//! let first = differ.diff(vec!["a", "bb"], &key, &ValueEquality).unwrap();
//! assert_eq!(first.adds(), 2);
//!
//! let second = differ.diff(vec!["a", "cc", "ddd"], &key, &ValueEquality).unwrap();
//! assert_eq!(second.updates(), 1);
//! assert_eq!(second.adds(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod diff;
pub mod expiry;
pub mod list;
pub mod operators;
pub mod proxy;
pub mod refresh;

pub use cache::ChangeAwareCache;
pub use diff::{Equality, KeySelector, SnapshotDiffer, TryKey, ValueEquality};
pub use expiry::{expiry_at, ExpiryIndex};
pub use list::{BoundedList, ItemId};
pub use operators::{KeyedFilter, KeyedTransform};
pub use proxy::{FilterProxy, ProxyTable, Upserted};
pub use refresh::RefreshAware;
