//! Inbound SDK messages.
//!
//! Every frame the SDK emits is a JSON object whose `msg` field names the
//! variant. [`Message::decode`] performs the one and only structural check:
//! after it succeeds, all downstream logic matches on typed variants.
//! Frames with an unknown `msg` value are rejected, never coerced.

pub mod access_right;
pub mod failure_code;
pub mod payload;

use crate::core::error::{DecodeError, EncodeError};
use payload::{
    AccessRights, ApiLevel, Auth, Certificate, ChangePin, CredentialRequest, ErrorReport, Info,
    InsertCard, Pause, ReaderData, ReaderList, Status,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded SDK message.
///
/// See <https://www.ausweisapp.bund.de/sdk/messages.html>.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    AccessRights(AccessRights),
    ApiLevel(ApiLevel),
    Auth(Auth),
    BadState(ErrorReport),
    Certificate(Certificate),
    ChangePin(ChangePin),
    EnterCan(CredentialRequest),
    EnterNewPin(CredentialRequest),
    EnterPin(CredentialRequest),
    EnterPuk(CredentialRequest),
    Info(Info),
    InsertCard(InsertCard),
    InternalError(ErrorReport),
    Invalid(ErrorReport),
    Pause(Pause),
    Reader(ReaderData),
    ReaderList(ReaderList),
    Status(Status),
    UnknownCommand(ErrorReport),
}

/// Discriminant of a [`Message`], spelled as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    AccessRights,
    ApiLevel,
    Auth,
    BadState,
    Certificate,
    ChangePin,
    EnterCan,
    EnterNewPin,
    EnterPin,
    EnterPuk,
    Info,
    InsertCard,
    InternalError,
    Invalid,
    Pause,
    Reader,
    ReaderList,
    Status,
    UnknownCommand,
}

impl MessageKind {
    /// The wire spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::AccessRights => "ACCESS_RIGHTS",
            MessageKind::ApiLevel => "API_LEVEL",
            MessageKind::Auth => "AUTH",
            MessageKind::BadState => "BAD_STATE",
            MessageKind::Certificate => "CERTIFICATE",
            MessageKind::ChangePin => "CHANGE_PIN",
            MessageKind::EnterCan => "ENTER_CAN",
            MessageKind::EnterNewPin => "ENTER_NEW_PIN",
            MessageKind::EnterPin => "ENTER_PIN",
            MessageKind::EnterPuk => "ENTER_PUK",
            MessageKind::Info => "INFO",
            MessageKind::InsertCard => "INSERT_CARD",
            MessageKind::InternalError => "INTERNAL_ERROR",
            MessageKind::Invalid => "INVALID",
            MessageKind::Pause => "PAUSE",
            MessageKind::Reader => "READER",
            MessageKind::ReaderList => "READER_LIST",
            MessageKind::Status => "STATUS",
            MessageKind::UnknownCommand => "UNKNOWN_COMMAND",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    /// Decode one SDK frame.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|source| DecodeError::from_frame(raw, source))
    }

    /// Encode back into the SDK's wire format.
    pub fn encode(&self) -> Result<String, EncodeError> {
        serde_json::to_string(self).map_err(EncodeError::from)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::AccessRights(_) => MessageKind::AccessRights,
            Message::ApiLevel(_) => MessageKind::ApiLevel,
            Message::Auth(_) => MessageKind::Auth,
            Message::BadState(_) => MessageKind::BadState,
            Message::Certificate(_) => MessageKind::Certificate,
            Message::ChangePin(_) => MessageKind::ChangePin,
            Message::EnterCan(_) => MessageKind::EnterCan,
            Message::EnterNewPin(_) => MessageKind::EnterNewPin,
            Message::EnterPin(_) => MessageKind::EnterPin,
            Message::EnterPuk(_) => MessageKind::EnterPuk,
            Message::Info(_) => MessageKind::Info,
            Message::InsertCard(_) => MessageKind::InsertCard,
            Message::InternalError(_) => MessageKind::InternalError,
            Message::Invalid(_) => MessageKind::Invalid,
            Message::Pause(_) => MessageKind::Pause,
            Message::Reader(_) => MessageKind::Reader,
            Message::ReaderList(_) => MessageKind::ReaderList,
            Message::Status(_) => MessageKind::Status,
            Message::UnknownCommand(_) => MessageKind::UnknownCommand,
        }
    }

    /// The `error` text carried by the message, if any.
    pub fn error_text(&self) -> Option<&str> {
        match self {
            Message::AccessRights(m) => m.error.as_deref(),
            Message::ApiLevel(m) => m.error.as_deref(),
            Message::Auth(m) => m.error.as_deref(),
            Message::EnterCan(m)
            | Message::EnterNewPin(m)
            | Message::EnterPin(m)
            | Message::EnterPuk(m) => m.error.as_deref(),
            Message::InsertCard(m) => m.error.as_deref(),
            Message::BadState(m)
            | Message::InternalError(m)
            | Message::Invalid(m)
            | Message::UnknownCommand(m) => Some(m.error.as_str()),
            Message::Certificate(_)
            | Message::ChangePin(_)
            | Message::Info(_)
            | Message::Pause(_)
            | Message::Reader(_)
            | Message::ReaderList(_)
            | Message::Status(_) => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_text() {
            Some(error) => write!(f, "{} ({})", self.kind(), error),
            None => write!(f, "{}", self.kind()),
        }
    }
}
