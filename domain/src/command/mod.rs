//! Outbound SDK commands.
//!
//! A [`Command`] is built once per call and never mutated after it is
//! handed to the transport. The `cmd` field carries the discriminant and the
//! remaining fields follow the SDK's camelCase spelling.

use crate::core::error::EncodeError;
use crate::message::access_right::AccessRight;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written in place of PIN, CAN and PUK values in diagnostics.
pub const REDACTED: &str = "******";

/// A command sent to the SDK.
///
/// See <https://www.ausweisapp.bund.de/sdk/commands.html>.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    GetInfo,
    GetStatus,
    GetApiLevel,
    SetApiLevel {
        level: u32,
    },
    GetReader {
        name: String,
    },
    GetReaderList,
    #[serde(rename_all = "camelCase")]
    RunAuth {
        #[serde(rename = "tcTokenURL")]
        tc_token_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        developer_mode: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        handle_interrupt: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        messages: Option<WorkflowMessages>,
    },
    #[serde(rename_all = "camelCase")]
    RunChangePin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        handle_interrupt: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        messages: Option<WorkflowMessages>,
    },
    GetAccessRights,
    SetAccessRights {
        chat: Vec<AccessRight>,
    },
    SetCard {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        simulator: Option<Simulator>,
    },
    Continue,
    GetCertificate,
    Cancel,
    Accept,
    Interrupt,
    SetPin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    SetNewPin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    SetCan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    SetPuk {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl Command {
    /// The wire spelling of the `cmd` discriminant.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetInfo => "GET_INFO",
            Command::GetStatus => "GET_STATUS",
            Command::GetApiLevel => "GET_API_LEVEL",
            Command::SetApiLevel { .. } => "SET_API_LEVEL",
            Command::GetReader { .. } => "GET_READER",
            Command::GetReaderList => "GET_READER_LIST",
            Command::RunAuth { .. } => "RUN_AUTH",
            Command::RunChangePin { .. } => "RUN_CHANGE_PIN",
            Command::GetAccessRights => "GET_ACCESS_RIGHTS",
            Command::SetAccessRights { .. } => "SET_ACCESS_RIGHTS",
            Command::SetCard { .. } => "SET_CARD",
            Command::Continue => "CONTINUE",
            Command::GetCertificate => "GET_CERTIFICATE",
            Command::Cancel => "CANCEL",
            Command::Accept => "ACCEPT",
            Command::Interrupt => "INTERRUPT",
            Command::SetPin { .. } => "SET_PIN",
            Command::SetNewPin { .. } => "SET_NEW_PIN",
            Command::SetCan { .. } => "SET_CAN",
            Command::SetPuk { .. } => "SET_PUK",
        }
    }

    /// Serialize into one JSON object, ready for the transport.
    pub fn encode(&self) -> Result<String, EncodeError> {
        serde_json::to_string(self).map_err(EncodeError::from)
    }

    /// Whether the command starts, steers or ends a workflow, as opposed to
    /// querying the SDK itself.
    pub fn is_workflow(&self) -> bool {
        !matches!(
            self,
            Command::GetInfo
                | Command::GetStatus
                | Command::GetApiLevel
                | Command::SetApiLevel { .. }
                | Command::GetReader { .. }
                | Command::GetReaderList
        )
    }

    /// Whether the command carries a PIN, CAN or PUK value.
    pub fn carries_secret(&self) -> bool {
        matches!(
            self,
            Command::SetPin { value: Some(_) }
                | Command::SetNewPin { value: Some(_) }
                | Command::SetCan { value: Some(_) }
                | Command::SetPuk { value: Some(_) }
        )
    }

    /// A copy safe to hand to diagnostics: secret values are replaced by
    /// [`REDACTED`], presence is preserved.
    pub fn redacted(&self) -> Command {
        let mask = |value: &Option<String>| value.as_ref().map(|_| REDACTED.to_string());
        match self {
            Command::SetPin { value } => Command::SetPin { value: mask(value) },
            Command::SetNewPin { value } => Command::SetNewPin { value: mask(value) },
            Command::SetCan { value } => Command::SetCan { value: mask(value) },
            Command::SetPuk { value } => Command::SetPuk { value: mask(value) },
            other => other.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Texts of the iOS system dialog shown while the card is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMessages {
    pub session_started: String,
    pub session_failed: String,
    pub session_succeeded: String,
    /// Appended with the current progress percentage.
    pub session_in_progress: String,
}

/// Card contents for the SDK's simulated reader.
///
/// See <https://www.ausweisapp.bund.de/sdk/simulator.html>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulator {
    #[serde(default)]
    pub files: Vec<SimulatorFile>,
    #[serde(default)]
    pub keys: Vec<SimulatorKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorFile {
    pub file_id: String,
    pub short_file_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorKey {
    pub id: u32,
    pub private: String,
}
