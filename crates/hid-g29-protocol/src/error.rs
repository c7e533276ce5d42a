//! Protocol-level errors.

use thiserror::Error;

/// Errors raised by the decoder and encoder.
///
/// Numeric parameters never produce errors; they are clamped. Only frames of
/// the wrong length and structurally malformed commands are rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    #[error("Invalid command shape: {0}")]
    InvalidCommandShape(String),
}

impl ProtocolError {
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        ProtocolError::InvalidCommandShape(reason.into())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MalformedFrame {
            expected: 12,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Malformed frame: expected 12 bytes, got 3");

        let err = ProtocolError::invalid_shape("relay report must be 7 bytes");
        assert_eq!(
            err.to_string(),
            "Invalid command shape: relay report must be 7 bytes"
        );
    }
}
