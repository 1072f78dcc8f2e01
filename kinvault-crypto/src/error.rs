//! Envelope validation error types.

use thiserror::Error;

/// Result type for envelope codec operations.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Errors raised when an envelope fails boundary validation.
///
/// Messages carry field names and lengths only — never envelope bytes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} has invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} is not valid base64")]
    Encoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
}
