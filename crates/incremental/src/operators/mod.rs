//! Keyed change-set operators.
//!
//! Each operator consumes upstream change sets and produces the change set
//! its downstream view needs. Both honor the refresh contract.

mod filter;
mod transform;

pub use filter::KeyedFilter;
pub use transform::KeyedTransform;
