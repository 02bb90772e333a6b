//! Domain layer for ausweis-bridge
//!
//! This crate contains the SDK wire model and the error taxonomy. It has no
//! dependencies on async runtimes, transports or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Messages and commands
//!
//! - **Message**: one inbound SDK frame, tagged by `msg`, decoded exactly once
//! - **Command**: one outbound SDK frame, tagged by `cmd`, immutable once sent
//!
//! ## Error taxonomy
//!
//! The SDK never echoes a request id, so whether a message fails a call
//! depends on the call:
//!
//! - **Basic errors** (`BAD_STATE`, `INTERNAL_ERROR`, `INVALID`,
//!   `UNKNOWN_COMMAND`) fail every call
//! - **Workflow errors** (failed `AUTH`, `CHANGE_PIN`) fail workflow calls
//! - **Guards** (deactivated card) fail only calls that opt in

pub mod classify;
pub mod command;
pub mod core;
pub mod message;
pub mod reply;

// Re-export commonly used types
pub use classify::{
    ErrorClass, ErrorScope, Guard, classify, is_auth_error, is_basic_error, is_card_deactivated,
    is_card_unknown, is_change_pin_error, is_error,
};
pub use command::{Command, Simulator, SimulatorFile, SimulatorKey, WorkflowMessages};
pub use crate::core::error::{DecodeError, EncodeError};
pub use message::{
    Message, MessageKind,
    access_right::AccessRight,
    failure_code::FailureCode,
    payload::{
        AccessRights, AccessRightsChat, ApiLevel, Auth, AuthResult, AusweisAppState,
        AuxiliaryData, Card, Certificate, CertificateDescription, CertificateValidity, ChangePin,
        CredentialRequest, ErrorReport, Info, InsertCard, Pause, ReaderData, ReaderList, Status,
        VersionInfo, Workflow,
    },
};
pub use reply::{CancelReply, CanReply, CardPrompt, PinReply, PukReply, Reply};
