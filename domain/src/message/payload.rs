//! Payload structures carried by SDK messages.
//!
//! Field names follow the SDK's JSON spelling via serde renames. Optional
//! fields stay `Option` so that "absent" remains distinguishable from
//! "false" where the error taxonomy depends on it (e.g. `ChangePin::success`,
//! `Card::deactivated`).

use super::access_right::AccessRight;
use super::failure_code::FailureCode;
use super::MessageKind;
use serde::{Deserialize, Serialize};

/// Workflow the SDK is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Workflow {
    Auth,
    ChangePin,
}

/// `ACCESS_RIGHTS` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux: Option<AuxiliaryData>,
    pub chat: AccessRightsChat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_info: Option<String>,
}

/// Requested, optional and effective access rights of a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRightsChat {
    #[serde(default)]
    pub effective: Vec<AccessRight>,
    #[serde(default)]
    pub optional: Vec<AccessRight>,
    #[serde(default)]
    pub required: Vec<AccessRight>,
}

/// Optional auxiliary data of the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxiliaryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_verification_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
}

/// `API_LEVEL` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLevel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
}

/// `AUTH` payload.
///
/// Sent once when the workflow starts (no `result`) and once when it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AuthResult>,
}

/// Final result of an authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureCode>,
}

impl AuthResult {
    /// Marker the SDK puts into `major` when the result is an error.
    pub const MAJOR_ERROR_MARKER: &'static str = "resultmajor#error";

    /// Whether `major` denotes an error outcome.
    pub fn is_error(&self) -> bool {
        self.major.contains(Self::MAJOR_ERROR_MARKER)
    }
}

/// Shared payload of `BAD_STATE`, `INTERNAL_ERROR`, `INVALID` and
/// `UNKNOWN_COMMAND`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
}

/// `CERTIFICATE` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub description: CertificateDescription,
    pub validity: CertificateValidity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDescription {
    pub issuer_name: String,
    pub issuer_url: String,
    pub subject_name: String,
    pub subject_url: String,
    pub terms_of_usage: String,
    pub purpose: String,
}

/// Validity dates of a certificate, in UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateValidity {
    pub effective_date: String,
    pub expiration_date: String,
}

/// `CHANGE_PIN` payload.
///
/// `success` is absent while the workflow is starting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureCode>,
}

/// Shared payload of `ENTER_PIN`, `ENTER_CAN`, `ENTER_PUK` and
/// `ENTER_NEW_PIN`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader: Option<ReaderData>,
}

impl CredentialRequest {
    /// Remaining PIN retries of the inserted card, if known.
    pub fn retry_counter(&self) -> Option<i32> {
        self.reader
            .as_ref()
            .and_then(|r| r.card.as_ref())
            .and_then(|c| c.retry_counter)
    }
}

/// `INFO` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "VersionInfo")]
    pub version_info: VersionInfo,
    #[serde(
        rename = "AusweisApp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ausweis_app: Option<AusweisAppState>,
}

/// Connection state to an integrated AusweisApp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AusweisAppState {
    Connected,
    Disconnected,
    InvalidCertificate,
    IncompatibleVersion,
    Unknown,
}

/// Version information of the running SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Implementation-Title")]
    pub implementation_title: String,
    #[serde(rename = "Implementation-Vendor")]
    pub implementation_vendor: String,
    #[serde(rename = "Implementation-Version")]
    pub implementation_version: String,
    #[serde(rename = "Specification-Title")]
    pub specification_title: String,
    #[serde(rename = "Specification-Vendor")]
    pub specification_vendor: String,
    #[serde(rename = "Specification-Version")]
    pub specification_version: String,
}

/// `INSERT_CARD` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `PAUSE` payload. The workflow waits until `CONTINUE` is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pause {
    pub cause: String,
}

/// Card reader state, used by `READER` and embedded in other messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderData {
    pub name: String,
    #[serde(default)]
    pub insertable: bool,
    #[serde(default)]
    pub attached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypad: Option<bool>,
    /// `None` when no card is inserted (the SDK sends `null`).
    #[serde(default)]
    pub card: Option<Card>,
}

/// State of an inserted card. An empty object means the SDK has not
/// determined the card state yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inoperative: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_counter: Option<i32>,
}

/// `READER_LIST` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderList {
    #[serde(default)]
    pub readers: Vec<ReaderData>,
}

impl ReaderList {
    pub fn contains(&self, name: &str) -> bool {
        self.readers.iter().any(|reader| reader.name == name)
    }
}

/// `STATUS` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub workflow: Option<Workflow>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub state: Option<MessageKind>,
}
