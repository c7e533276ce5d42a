//! Error types for g29ctl

use racing_wheel_g29_session::{SessionError, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid capture file: {0}")]
    InvalidCapture(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Session(e) => session_exit_code(e),
            CliError::InvalidCapture(_)
            | CliError::InvalidConfiguration(_)
            | CliError::InvalidArgument(_)
            | CliError::JsonError(_) => 4,
            CliError::IoError(_) => 1,
        }
    }
}

fn session_exit_code(error: &SessionError) -> i32 {
    match error {
        SessionError::Transport(TransportError::NoDeviceFound { .. }) => 2,
        SessionError::Config(_) | SessionError::Protocol(_) | SessionError::UnknownTopic(_) => 4,
        SessionError::Transport(
            TransportError::PermissionDenied(_) | TransportError::NotSecureContext,
        ) => 6,
        _ => 1,
    }
}

/// Exit code for an error returned from a command.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<CliError>() {
        e.exit_code()
    } else if let Some(e) = error.downcast_ref::<SessionError>() {
        session_exit_code(e)
    } else {
        1
    }
}
