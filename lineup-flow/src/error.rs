use thiserror::Error;

use crate::stage::StageTag;

/// Errors returned by orchestrator commands.
///
/// Remote failures never show up here: they are converted into a
/// [`WorkflowError`](crate::WorkflowError) and parked in the error channel.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No file selected")]
    MissingFile,

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Command `{command}` is not accepted while {stage}")]
    InvalidCommand {
        command: &'static str,
        stage: StageTag,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Local checks run at confirmation time. These never leave the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event name is blank")]
    BlankEventName,

    #[error("no artists left to add")]
    NoArtists,
}

/// Failure reported by a [`RequestGateway`](crate::RequestGateway) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No response was received (connection refused, timeout, ...).
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The remote answered and reported a failure.
    #[error("Remote failure (status {status:?}): {message:?}")]
    Remote {
        status: Option<u16>,
        message: Option<String>,
    },

    /// The remote answered with a success status but the payload did not parse.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Message supplied by the remote, if any. Blank messages count as absent.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            GatewayError::Remote {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
