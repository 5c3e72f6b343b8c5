//! Error types for the IAMF toolchain.
//!
//! A single taxonomy is shared by every crate in the workspace; components
//! propagate errors to the caller that initiated the session rather than
//! suppressing them.

use thiserror::Error;

/// Main error type for the IAMF toolchain.
#[derive(Error, Debug)]
pub enum Error {
    /// A field value, bitstream construct, or configuration entry is
    /// malformed or inconsistent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A read or write was requested with a width exceeding the declared
    /// precision.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// The read-buffer source ran out of bits.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An operation was invoked in a state that does not admit it.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// I/O errors from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An opaque failure from an external collaborator.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an out of range error.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Error::OutOfRange(msg.into())
    }

    /// Create a resource exhausted error.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Error::ResourceExhausted(msg.into())
    }

    /// Create a failed precondition error.
    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Error::FailedPrecondition(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Error::Unknown(msg.into())
    }

    /// Check whether this error carries the invalid-argument kind.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("bad field");
        assert_eq!(err.to_string(), "Invalid argument: bad field");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_is_invalid_argument() {
        assert!(Error::invalid_argument("x").is_invalid_argument());
        assert!(!Error::unknown("x").is_invalid_argument());
    }
}
