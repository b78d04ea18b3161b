//! Error taxonomy for the verification core.

use core::result::Result as CoreResult;
use std::io::Error as IoError;

use thiserror::Error;
use toml::de::Error as TomlDeError;
use toml::ser::Error as TomlSerError;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Infrastructure failures raised by the verification core.
///
/// Non-convergence is deliberately absent: an expected state that never shows
/// up is reported as [`crate::Convergence::TimedOut`], not as an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The store connection could not be obtained.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A row could not be materialized after the cursor was opened.
    #[error("Store read failed: {0}")]
    StoreRead(String),

    /// A mutation could not be applied to the store.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// A UI element or text did not appear within its own search window.
    #[error("Action target not found: '{target}' (searched {timeout_ms} ms)")]
    ActionTargetNotFound {
        /// Text or element that was searched for
        target: String,
        /// Search window in milliseconds
        timeout_ms: u64,
    },

    /// The UI is showing a different screen than the one the action requires.
    #[error("Unexpected screen: expected '{expected}', found '{actual}'")]
    UnexpectedScreen {
        /// Screen the action expected
        expected: String,
        /// Screen actually showing
        actual: String,
    },

    /// Timing or budget configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlDeError),

    /// TOML serialization failed.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] TomlSerError),
}

impl Error {
    /// Whether the failure came from the backing store rather than the UI.
    ///
    /// None of the variants is retryable: retrying belongs to the poller's
    /// stage mechanism, and an error always aborts the running scenario.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::StoreRead(_) | Self::StoreWrite(_)
        )
    }
}
