//! Error types for Ripple.

use alloc::string::{String, ToString};
use thiserror::Error;

/// Result type alias for Ripple operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for change-propagation operations.
///
/// Errors are `Clone` because a single failure is observed by every consumer
/// of a terminated stream, and `PartialEq` so a consumer can check that the
/// error it received is the one the source raised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A caller supplied an argument that can never work.
    #[error("invalid argument `{name}`: {message}")]
    InvalidArgument {
        name: &'static str,
        message: String,
    },
    /// The key selector could not produce a key for an item.
    #[error("key selector failed: {message}")]
    KeySelector {
        message: String,
    },
    /// A source (upstream or per-item) failed.
    #[error("source failed: {message}")]
    Source {
        message: String,
    },
    /// The scheduler refused or failed to schedule work.
    #[error("scheduler failed: {message}")]
    Scheduler {
        message: String,
    },
    /// A parallel selector failed for the item at `index`.
    #[error("selector failed for item {index}: {message}")]
    Selector {
        index: usize,
        message: String,
    },
    /// The operation was attempted on a disposed resource.
    #[error("resource already disposed")]
    Disposed,
}

impl Error {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    /// Creates a key selector error.
    pub fn key_selector(message: impl Into<String>) -> Self {
        Error::KeySelector {
            message: message.into(),
        }
    }

    /// Creates a source error.
    pub fn source_failed(message: impl Into<String>) -> Self {
        Error::Source {
            message: message.into(),
        }
    }

    /// Creates a scheduler error.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Error::Scheduler {
            message: message.into(),
        }
    }

    /// Creates a selector error for the item at `index`.
    pub fn selector(index: usize, message: impl ToString) -> Self {
        Error::Selector {
            index,
            message: message.to_string(),
        }
    }

    /// Returns true if this error was raised by a source rather than by Ripple.
    pub fn is_source(&self) -> bool {
        matches!(self, Error::Source { .. })
    }
}
