//! Error types for store access, enumeration, and the worker transport.

use thiserror::Error;

/// Library-wide error type.
///
/// Failures inside a worker operation never cross the transport boundary as
/// raw panics; they are converted to an `*-error` event carrying the
/// `Display` message, and the call channel receives the same value.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The private storage area could not be established. Fatal to the
    /// feature, surfaced once when the store is opened.
    #[error("private storage area unavailable: {0}")]
    StorageUnavailable(String),

    /// A requested entry does not resolve to anything in the store.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Entry names are single path components; separators and traversal are
    /// rejected before any I/O happens.
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    /// Any read/write/remove failure during an operation.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation was observed. Surfaced as an `aborted`
    /// event, never as an error event.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration or logging setup failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// The worker task is gone and the channel is closed.
    #[error("worker transport closed")]
    TransportClosed,
}

impl StoreError {
    /// Whether this failure should surface as `aborted` rather than an
    /// `*-error` event.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StoreError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_not_an_error_event() {
        assert!(StoreError::Cancelled.is_cancellation());
        assert!(!StoreError::EntryNotFound("x".into()).is_cancellation());
    }

    #[test]
    fn io_errors_convert() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.to_string().contains("disk gone"));
    }
}
