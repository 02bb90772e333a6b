//! Error types for the application layer

use crate::ports::transport::TransportError;
use ausweis_domain::{EncodeError, FailureCode, Message};
use std::time::Duration;
use thiserror::Error;

/// Terminal failure of a correlated command.
///
/// Rejections caused by a message carry that message unchanged, so callers
/// can branch on its `error` or `reason` fields.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{command} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },

    #[error("{command} failed on transport: {source}")]
    Transport {
        command: &'static str,
        source: TransportError,
    },

    /// `BAD_STATE`, `INTERNAL_ERROR`, `INVALID` or `UNKNOWN_COMMAND`.
    #[error("{command} rejected: {message}")]
    Protocol {
        command: &'static str,
        message: Box<Message>,
    },

    /// Failed `AUTH` or `CHANGE_PIN` workflow.
    #[error("{command} failed: {message}")]
    Workflow {
        command: &'static str,
        message: Box<Message>,
    },

    #[error("{command} rejected by {guard} guard: {message}")]
    Guarded {
        command: &'static str,
        guard: &'static str,
        message: Box<Message>,
    },

    #[error("Transport closed while awaiting reply to {command}")]
    TransportClosed { command: &'static str },

    #[error("Failed to transmit {command}: {source}")]
    Transmit {
        command: &'static str,
        source: TransportError,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("{command} resolved with unexpected {}", .message.kind())]
    UnexpectedReply {
        command: &'static str,
        message: Box<Message>,
    },

    #[error("{command} awaits no reply kind")]
    NothingExpected { command: &'static str },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }

    /// The SDK message that rejected the call, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            CommandError::Protocol { message, .. }
            | CommandError::Workflow { message, .. }
            | CommandError::Guarded { message, .. }
            | CommandError::UnexpectedReply { message, .. } => Some(&**message),
            _ => None,
        }
    }

    /// Failure code of a rejected workflow, if the SDK sent one.
    pub fn failure_code(&self) -> Option<FailureCode> {
        match self.message()? {
            Message::Auth(auth) => auth.result.as_ref()?.reason.clone(),
            Message::ChangePin(change) => change.reason.clone(),
            _ => None,
        }
    }
}

/// Failure of a session lifecycle transition.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("SDK did not {action} within {}ms", .timeout.as_millis())]
    Timeout {
        action: &'static str,
        timeout: Duration,
    },

    #[error("Transport error during {action}: {source}")]
    Transport {
        action: &'static str,
        source: TransportError,
    },
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// Failure of [`WorkflowHelper::initialize`](crate::workflow_helper::WorkflowHelper::initialize).
#[derive(Error, Debug)]
pub enum InitializeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Requested API level {requested} not available (available: {available:?})")]
    ApiLevelUnavailable { requested: u32, available: Vec<u32> },
}
