//! Transport and session errors.

use racing_wheel_hid_g29_protocol::ProtocolError;
use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by a [`WheelPort`](crate::WheelPort) or
/// [`WheelHandle`](crate::WheelHandle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No device found matching {vendor_id:04X}:{product_id:04X}")]
    NoDeviceFound { vendor_id: u16, product_id: u16 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device access requires a secure context")]
    NotSecureContext,

    #[error("Device busy")]
    DeviceBusy,

    #[error("Device disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the same operation may succeed if simply tried again.
    ///
    /// The session never retries on its own; this is for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::DeviceBusy)
    }

    /// Whether this error means there is no usable device connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransportError::NoDeviceFound { .. }
                | TransportError::PermissionDenied(_)
                | TransportError::NotSecureContext
                | TransportError::Disconnected
        )
    }

    pub fn io(message: impl Into<String>) -> Self {
        TransportError::Io(message.into())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Session not connected (state: {0})")]
    NotConnected(SessionState),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
}

impl SessionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transport(e) if e.is_retryable())
    }

    pub fn is_connection_error(&self) -> bool {
        match self {
            SessionError::Transport(e) => e.is_connection_error(),
            SessionError::NotConnected(_) => true,
            _ => false,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
