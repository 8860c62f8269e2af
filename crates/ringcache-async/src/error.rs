//! Error types for suspending allocation.

use thiserror::Error;

/// Result type for suspending allocation.
pub type AllocResult<T> = Result<T, AllocError>;

/// Errors reported by [`AsyncRing::alloc`](crate::AsyncRing::alloc).
///
/// A request that merely has to wait for space is not an error; it parks.
/// These cover requests that could never complete and rings that were
/// shut down.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    /// The requested length was zero.
    #[error("slot length must be greater than 0")]
    ZeroLength,

    /// The request exceeds what the ring can ever hand out, so parking it
    /// would wedge the waiter queue forever.
    #[error("slot of {requested} bytes exceeds the ring limit of {max} bytes")]
    TooLarge {
        /// The requested payload length.
        requested: usize,
        /// The largest satisfiable payload length.
        max: usize,
    },

    /// The ring was closed; parked and future requests both fail.
    #[error("ring is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AllocError::TooLarge {
            requested: 2048,
            max: 1024,
        };
        let rendered = format!("{}", err);
        assert!(rendered.contains("2048"));
        assert!(rendered.contains("1024"));
    }
}
