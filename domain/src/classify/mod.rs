//! Error taxonomy over decoded messages.
//!
//! Pure predicates. Whether a message is a failure depends on the calling
//! context: basic errors always are, workflow errors only for calls scoped
//! to a workflow, and a deactivated card only for calls that opted into the
//! [`Guard::CARD_DEACTIVATED`] guard.

use crate::message::{Message, MessageKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds that always denote a protocol level failure.
pub const BASIC_ERROR_KINDS: [MessageKind; 4] = [
    MessageKind::BadState,
    MessageKind::InternalError,
    MessageKind::Invalid,
    MessageKind::UnknownCommand,
];

pub fn is_basic_error(message: &Message) -> bool {
    BASIC_ERROR_KINDS.contains(&message.kind())
}

/// An `AUTH` message carrying an `error`, or a result whose major code
/// denotes an error.
pub fn is_auth_error(message: &Message) -> bool {
    match message {
        Message::Auth(auth) => {
            auth.error.is_some() || auth.result.as_ref().is_some_and(|r| r.is_error())
        }
        _ => false,
    }
}

/// A `CHANGE_PIN` message with `success: false`. An absent `success` means
/// the workflow is still running.
pub fn is_change_pin_error(message: &Message) -> bool {
    matches!(
        message,
        Message::ChangePin(change) if change.success == Some(false)
    )
}

/// A `READER` message whose inserted card is deactivated.
pub fn is_card_deactivated(message: &Message) -> bool {
    match message {
        Message::Reader(reader) => reader
            .card
            .as_ref()
            .is_some_and(|card| card.deactivated == Some(true)),
        _ => false,
    }
}

/// A `READER` message with a card whose state the SDK has not determined
/// yet. Diagnostic only, never treated as a failure.
pub fn is_card_unknown(message: &Message) -> bool {
    match message {
        Message::Reader(reader) => reader
            .card
            .as_ref()
            .is_some_and(|card| card.deactivated.is_none()),
        _ => false,
    }
}

/// Basic or workflow error. A deactivated card is deliberately not part of
/// this predicate.
pub fn is_error(message: &Message) -> bool {
    is_basic_error(message) || is_auth_error(message) || is_change_pin_error(message)
}

/// Category of a message that [`is_error`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `BAD_STATE`, `INTERNAL_ERROR`, `INVALID` or `UNKNOWN_COMMAND`.
    Protocol,
    /// A failed `AUTH` or `CHANGE_PIN` workflow.
    Workflow,
}

pub fn classify(message: &Message) -> Option<ErrorClass> {
    if is_basic_error(message) {
        Some(ErrorClass::Protocol)
    } else if is_auth_error(message) || is_change_pin_error(message) {
        Some(ErrorClass::Workflow)
    } else {
        None
    }
}

/// Which errors fail a correlated call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Basic and workflow errors. Used by commands that drive a workflow.
    #[default]
    All,
    /// Basic errors only. Used by workflow-agnostic queries so that a
    /// concurrently failing workflow does not fail them.
    BasicOnly,
}

impl ErrorScope {
    /// The error class this scope rejects `message` with, if any.
    pub fn rejects(&self, message: &Message) -> Option<ErrorClass> {
        match (self, classify(message)) {
            (_, Some(ErrorClass::Protocol)) => Some(ErrorClass::Protocol),
            (ErrorScope::All, Some(ErrorClass::Workflow)) => Some(ErrorClass::Workflow),
            _ => None,
        }
    }
}

/// Extra rejection rule layered on top of an [`ErrorScope`] for one call.
#[derive(Clone, Copy)]
pub struct Guard {
    name: &'static str,
    predicate: fn(&Message) -> bool,
}

impl Guard {
    /// Rejects `READER` messages reporting a deactivated card.
    pub const CARD_DEACTIVATED: Guard = Guard::new("card_deactivated", is_card_deactivated);

    pub const fn new(name: &'static str, predicate: fn(&Message) -> bool) -> Self {
        Self { name, predicate }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rejects(&self, message: &Message) -> bool {
        (self.predicate)(message)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.name).finish()
    }
}

impl PartialEq for Guard {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> Message {
        Message::decode(raw).unwrap()
    }

    /// One sample per kind, none of them carrying an error.
    fn harmless_samples() -> Vec<Message> {
        [
            r#"{"msg":"ACCESS_RIGHTS","chat":{"effective":[],"optional":[],"required":[]}}"#,
            r#"{"msg":"API_LEVEL","available":[1,2],"current":2}"#,
            r#"{"msg":"AUTH"}"#,
            r#"{"msg":"CERTIFICATE","description":{"issuerName":"i","issuerUrl":"u","subjectName":"s","subjectUrl":"u","termsOfUsage":"t","purpose":"p"},"validity":{"effectiveDate":"2024-01-01","expirationDate":"2024-02-01"}}"#,
            r#"{"msg":"CHANGE_PIN"}"#,
            r#"{"msg":"ENTER_CAN"}"#,
            r#"{"msg":"ENTER_NEW_PIN"}"#,
            r#"{"msg":"ENTER_PIN"}"#,
            r#"{"msg":"ENTER_PUK"}"#,
            r#"{"msg":"INFO","VersionInfo":{"Name":"n","Implementation-Title":"t","Implementation-Vendor":"v","Implementation-Version":"1","Specification-Title":"t","Specification-Vendor":"v","Specification-Version":"1"}}"#,
            r#"{"msg":"INSERT_CARD"}"#,
            r#"{"msg":"PAUSE","cause":"BadCardPosition"}"#,
            r#"{"msg":"READER","name":"NFC","attached":true,"card":null}"#,
            r#"{"msg":"READER_LIST","readers":[]}"#,
            r#"{"msg":"STATUS","workflow":"AUTH","progress":0,"state":null}"#,
        ]
        .into_iter()
        .map(decode)
        .collect()
    }

    fn basic_error_samples() -> Vec<Message> {
        ["BAD_STATE", "INTERNAL_ERROR", "INVALID", "UNKNOWN_COMMAND"]
            .into_iter()
            .map(|kind| decode(&format!(r#"{{"msg":"{kind}","error":"boom"}}"#)))
            .collect()
    }

    #[test]
    fn basic_errors_are_exactly_the_four_kinds() {
        for message in basic_error_samples() {
            assert!(is_basic_error(&message), "{message}");
            assert!(is_error(&message));
            assert_eq!(classify(&message), Some(ErrorClass::Protocol));
        }
        for message in harmless_samples() {
            assert!(!is_basic_error(&message), "{message}");
            assert!(!is_error(&message), "{message}");
        }
    }

    #[test]
    fn auth_error_needs_error_field_or_error_major() {
        let cases = [
            (r#"{"msg":"AUTH"}"#, false),
            (r#"{"msg":"AUTH","url":"https://example.org/?refID=1"}"#, false),
            (
                r#"{"msg":"AUTH","result":{"major":"http://www.bsi.bund.de/ecard/api/1.1/resultmajor#ok"}}"#,
                false,
            ),
            (
                r#"{"msg":"AUTH","result":{"major":"http://www.bsi.bund.de/ecard/api/1.1/resultmajor#error","reason":"Card_Removed"}}"#,
                true,
            ),
            (r#"{"msg":"AUTH","error":"Invalid tcTokenURL"}"#, true),
        ];
        for (raw, expected) in cases {
            let message = decode(raw);
            assert_eq!(is_auth_error(&message), expected, "{raw}");
            assert_eq!(is_error(&message), expected, "{raw}");
        }
    }

    #[test]
    fn change_pin_error_only_on_explicit_false() {
        let cases = [
            (r#"{"msg":"CHANGE_PIN"}"#, false),
            (r#"{"msg":"CHANGE_PIN","success":true}"#, false),
            (
                r#"{"msg":"CHANGE_PIN","success":false,"reason":"Change_Pin_User_Cancelled"}"#,
                true,
            ),
        ];
        for (raw, expected) in cases {
            assert_eq!(is_change_pin_error(&decode(raw)), expected, "{raw}");
        }
    }

    #[test]
    fn card_state_predicates() {
        let none = decode(r#"{"msg":"READER","name":"NFC","card":null}"#);
        let unknown = decode(r#"{"msg":"READER","name":"NFC","card":{}}"#);
        let active = decode(r#"{"msg":"READER","name":"NFC","card":{"deactivated":false,"inoperative":false,"retryCounter":3}}"#);
        let deactivated = decode(r#"{"msg":"READER","name":"NFC","card":{"deactivated":true,"inoperative":false,"retryCounter":3}}"#);

        assert!(!is_card_deactivated(&none) && !is_card_unknown(&none));
        assert!(!is_card_deactivated(&unknown) && is_card_unknown(&unknown));
        assert!(!is_card_deactivated(&active) && !is_card_unknown(&active));
        assert!(is_card_deactivated(&deactivated) && !is_card_unknown(&deactivated));

        // outside of guarded calls a deactivated card is plain progress
        assert!(!is_error(&deactivated));
    }

    #[test]
    fn basic_only_scope_lets_workflow_errors_pass() {
        let auth_error = decode(r#"{"msg":"AUTH","error":"failed"}"#);
        let invalid = decode(r#"{"msg":"INVALID","error":"test error"}"#);

        assert_eq!(ErrorScope::All.rejects(&auth_error), Some(ErrorClass::Workflow));
        assert_eq!(ErrorScope::BasicOnly.rejects(&auth_error), None);
        assert_eq!(ErrorScope::BasicOnly.rejects(&invalid), Some(ErrorClass::Protocol));
        assert_eq!(ErrorScope::All.rejects(&invalid), Some(ErrorClass::Protocol));
    }

    #[test]
    fn card_guard_rejects_only_deactivated_readers() {
        let guard = Guard::CARD_DEACTIVATED;
        let deactivated = decode(r#"{"msg":"READER","name":"NFC","card":{"deactivated":true}}"#);
        assert!(guard.rejects(&deactivated));
        for message in harmless_samples() {
            assert!(!guard.rejects(&message), "{message}");
        }
        assert_eq!(format!("{guard:?}"), r#"Guard("card_deactivated")"#);
    }
}
