//! Refresh propagation.
//!
//! A Refresh says "the value under this key may have changed in a way that
//! matters to you". Every stateful operator that derives membership, order
//! or grouping from an item's value must re-evaluate on Refresh and report
//! what changed downstream:
//!
//! - membership unaffected: forward a Refresh;
//! - membership changed: emit the Add or Remove that resyncs the subscriber.

use ripple_core::Change;

/// An operator that honors the refresh contract.
pub trait RefreshAware<T, K> {
    /// The item type the operator emits.
    type Output;

    /// Re-evaluates the item under `key` after an upstream Refresh carrying
    /// `current`.
    ///
    /// Returns the change the downstream view needs, or `None` when the key
    /// is not (and does not become) part of the operator's output.
    fn on_refresh(&mut self, key: &K, current: &T) -> Option<Change<Self::Output, K>>;
}
