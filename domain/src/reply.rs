//! Typed replies of correlated commands.
//!
//! Every command that expects an answer names the message kinds it accepts
//! through a [`Reply`] type. Single-kind replies are the payload structs
//! themselves; multi-kind replies are small unions generated below.

use crate::message::payload::{
    AccessRights, ApiLevel, Auth, Certificate, ChangePin, CredentialRequest, Info, ReaderData,
    ReaderList, Status,
};
use crate::message::{Message, MessageKind};

/// A message shape a correlated call may resolve with.
pub trait Reply: Sized {
    /// Kinds accepted as the reply. Never empty.
    const EXPECTED: &'static [MessageKind];

    /// Narrow a message of one of the [`Reply::EXPECTED`] kinds, handing it
    /// back unchanged otherwise.
    fn from_message(message: Message) -> Result<Self, Message>;
}

macro_rules! single_reply {
    ($($payload:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Reply for $payload {
                const EXPECTED: &'static [MessageKind] = &[MessageKind::$variant];

                fn from_message(message: Message) -> Result<Self, Message> {
                    match message {
                        Message::$variant(payload) => Ok(payload),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

single_reply! {
    AccessRights => AccessRights,
    ApiLevel => ApiLevel,
    Certificate => Certificate,
    ChangePin => ChangePin,
    Info => Info,
    ReaderData => Reader,
    ReaderList => ReaderList,
    Status => Status,
}

macro_rules! reply_union {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($payload:ty)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $($variant($payload),)+
        }

        impl $name {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $($name::$variant(_) => MessageKind::$variant,)+
                }
            }
        }

        impl Reply for $name {
            const EXPECTED: &'static [MessageKind] = &[$(MessageKind::$variant,)+];

            fn from_message(message: Message) -> Result<Self, Message> {
                match message {
                    $(Message::$variant(payload) => Ok($name::$variant(payload)),)+
                    other => Err(other),
                }
            }
        }

        impl From<$name> for Message {
            fn from(reply: $name) -> Message {
                match reply {
                    $($name::$variant(payload) => Message::$variant(payload),)+
                }
            }
        }
    };
}

reply_union! {
    /// Credential prompt after `ACCEPT` or `RUN_CHANGE_PIN`.
    CardPrompt {
        EnterPin(CredentialRequest),
        EnterCan(CredentialRequest),
        EnterPuk(CredentialRequest),
    }
}

reply_union! {
    /// Reply to `SET_PIN`. `Auth` carries the refresh URL once the
    /// authentication finished.
    PinReply {
        EnterPin(CredentialRequest),
        EnterCan(CredentialRequest),
        EnterPuk(CredentialRequest),
        EnterNewPin(CredentialRequest),
        Auth(Auth),
    }
}

reply_union! {
    /// Reply to `SET_CAN`.
    CanReply {
        EnterCan(CredentialRequest),
        EnterPin(CredentialRequest),
    }
}

reply_union! {
    /// Reply to `SET_PUK`.
    PukReply {
        EnterPuk(CredentialRequest),
        EnterPin(CredentialRequest),
    }
}

reply_union! {
    /// Reply to `CANCEL`, depending on the running workflow.
    CancelReply {
        Auth(Auth),
        ChangePin(ChangePin),
    }
}

impl CardPrompt {
    pub fn request(&self) -> &CredentialRequest {
        match self {
            CardPrompt::EnterPin(r) | CardPrompt::EnterCan(r) | CardPrompt::EnterPuk(r) => r,
        }
    }
}

impl PinReply {
    /// The credential request, unless the workflow already finished.
    pub fn request(&self) -> Option<&CredentialRequest> {
        match self {
            PinReply::EnterPin(r)
            | PinReply::EnterCan(r)
            | PinReply::EnterPuk(r)
            | PinReply::EnterNewPin(r) => Some(r),
            PinReply::Auth(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_kinds_follow_declaration_order() {
        assert_eq!(
            PinReply::EXPECTED,
            &[
                MessageKind::EnterPin,
                MessageKind::EnterCan,
                MessageKind::EnterPuk,
                MessageKind::EnterNewPin,
                MessageKind::Auth,
            ]
        );
        assert_eq!(ReaderData::EXPECTED, &[MessageKind::Reader]);
    }

    #[test]
    fn union_narrows_matching_kind() {
        let message = Message::decode(
            r#"{"msg":"ENTER_CAN","reader":{"name":"NFC","attached":true,"card":{"retryCounter":1}}}"#,
        )
        .unwrap();
        let reply = PinReply::from_message(message).unwrap();
        assert_eq!(reply.kind(), MessageKind::EnterCan);
        assert_eq!(reply.request().and_then(|r| r.retry_counter()), Some(1));
    }

    #[test]
    fn mismatching_kind_is_handed_back() {
        let message = Message::decode(r#"{"msg":"INSERT_CARD"}"#).unwrap();
        let back = CanReply::from_message(message.clone()).unwrap_err();
        assert_eq!(back, message);
    }

    #[test]
    fn union_converts_back_into_message() {
        let reply = CancelReply::ChangePin(ChangePin {
            success: Some(false),
            reason: None,
        });
        assert_eq!(Message::from(reply).kind(), MessageKind::ChangePin);
    }
}
