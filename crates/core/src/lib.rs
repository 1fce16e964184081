//! Ripple Core - Change set model for the Ripple change-propagation engine.
//!
//! This crate provides the vocabulary every Ripple operator speaks:
//!
//! - `ChangeReason`: Add, Update, Remove, Refresh, Moved, Clear
//! - `Change`: one structural change to a keyed collection
//! - `ChangeSet`: an ordered, immutable batch of changes for one atomic transition
//! - `ChangeStatistics` / `ChangeSummary`: running counts over a change stream
//! - `Error`: error types shared by all Ripple crates
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{Change, ChangeReason, ChangeSet};
//!
//! let changes = ChangeSet::new(vec![
//!     Change::add(1, "Alice"),
//!     Change::update(2, "Bob", "Robert"),
//! ]);
//!
//! assert_eq!(changes.adds(), 1);
//! assert_eq!(changes.updates(), 1);
//! assert_eq!(changes[1].reason, ChangeReason::Update);
//! assert_eq!(changes[1].previous, Some("Robert"));
//! ```

#![no_std]

extern crate alloc;

mod change;
mod change_set;
mod error;
mod statistics;

pub use change::{Change, ChangeReason};
pub use change_set::ChangeSet;
pub use error::{Error, Result};
pub use statistics::{ChangeStatistics, ChangeSummary};
