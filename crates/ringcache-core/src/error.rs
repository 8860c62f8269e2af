//! Error types for ring construction.
//!
//! Allocation shortfall is not an error: `try_alloc` reports it by
//! returning `None`. Errors here cover configuration problems only.

use thiserror::Error;

/// Result type for ring operations.
pub type RingResult<T> = Result<T, RingError>;

/// Errors that can occur when building a ring.
#[derive(Debug, Error)]
pub enum RingError {
    /// Invalid configuration.
    #[error("ring configuration error: {reason}")]
    Config {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl RingError {
    /// Creates a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
