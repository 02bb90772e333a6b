//! Failure codes attached to `AUTH` results and `CHANGE_PIN` messages.
//!
//! Codes are passed through verbatim and must survive a decode/encode cycle
//! unchanged, so every variant keeps the exact wire spelling used by the
//! SDK. A code missing from the catalog is kept as
//! [`FailureCode::Unrecognized`] so that the message carrying it still
//! decodes and reaches classification.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! failure_codes {
    ($($variant:ident => $wire:literal,)+) => {
        /// Reason a workflow failed.
        ///
        /// See <https://www.ausweisapp.bund.de/sdk/failurecodes.html>.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum FailureCode {
            $($variant,)+
            /// A code this catalog does not list yet, in its wire spelling.
            Unrecognized(String),
        }

        impl FailureCode {
            /// Every catalogued failure code, in catalog order.
            pub const ALL: &'static [FailureCode] = &[$(FailureCode::$variant,)+];

            /// The wire spelling of this code.
            pub fn as_str(&self) -> &str {
                match self {
                    $(FailureCode::$variant => $wire,)+
                    FailureCode::Unrecognized(code) => code,
                }
            }

            fn catalogued(wire: &str) -> Option<FailureCode> {
                match wire {
                    $($wire => Some(FailureCode::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

failure_codes! {
    UserCancelled => "User_Cancelled",
    CardRemoved => "Card_Removed",
    ProcessingSendStatusFailed => "Processing_Send_Status_Failed",
    ParseTcTokenInvalidUrl => "Parse_TcToken_Invalid_Url",
    ParseTcTokenMissingUrl => "Parse_TcToken_Missing_Url",
    GetTcTokenInvalidUrl => "Get_TcToken_Invalid_Url",
    GetTcTokenInvalidRedirectUrl => "Get_TcToken_Invalid_Redirect_Url",
    GetTcTokenInvalidCertificateKeyLength => "Get_TcToken_Invalid_Certificate_Key_Length",
    GetTcTokenInvalidEphemeralKeyLength => "Get_TcToken_Invalid_Ephemeral_Key_Length",
    GetTcTokenInvalidServerReply => "Get_TcToken_Invalid_Server_Reply",
    GetTcTokenEmptyData => "Get_TcToken_Empty_Data",
    GetTcTokenInvalidData => "Get_TcToken_Invalid_Data",
    GetTcTokenNetworkError => "Get_TcToken_Network_Error",
    CertificateCheckFailedNoDescription => "Certificate_Check_Failed_No_Description",
    CertificateCheckFailedNoSubjectUrlInDescription => "Certificate_Check_Failed_No_SubjectUrl_In_Description",
    CertificateCheckFailedHashMismatch => "Certificate_Check_Failed_Hash_Mismatch",
    CertificateCheckFailedSameOriginPolicyViolation => "Certificate_Check_Failed_Same_Origin_Policy_Violation",
    CertificateCheckFailedHashMissingInDescription => "Certificate_Check_Failed_Hash_Missing_In_Description",
    PreVerificationNoTestEnvironment => "Pre_Verification_No_Test_Environment",
    PreVerificationInvalidCertificateChain => "Pre_Verification_Invalid_Certificate_Chain",
    PreVerificationInvalidCertificateSignature => "Pre_Verification_Invalid_Certificate_Signature",
    PreVerificationCertificateExpired => "Pre_Verification_Certificate_Expired",
    ExtractCvcsFromEac1NoUniqueAt => "Extract_Cvcs_From_Eac1_No_Unique_At",
    ExtractCvcsFromEac1NoUniqueDv => "Extract_Cvcs_From_Eac1_No_Unique_Dv",
    ExtractCvcsFromEac1AtMissing => "Extract_Cvcs_From_Eac1_At_Missing",
    ExtractCvcsFromEac1DvMissing => "Extract_Cvcs_From_Eac1_Dv_Missing",
    ConnectCardConnectionFailed => "Connect_Card_Connection_Failed",
    ConnectCardEidInactive => "Connect_Card_Eid_Inactive",
    PrepacePaceSmartEidInvalidated => "Prepace_Pace_Smart_Eid_Invalidated",
    EstablishPaceChannelNoActivePin => "Establish_Pace_Channel_No_Active_Pin",
    EstablishPaceChannelBasicReaderNoPin => "Establish_Pace_Channel_Basic_Reader_No_Pin",
    EstablishPaceChannelPukInoperative => "Establish_Pace_Channel_Puk_Inoperative",
    EstablishPaceChannelUserCancelled => "Establish_Pace_Channel_User_Cancelled",
    MaintainCardConnectionPaceUnrecoverable => "Maintain_Card_Connection_Pace_Unrecoverable",
    DidAuthenticateEac1CardCommandFailed => "Did_Authenticate_Eac1_Card_Command_Failed",
    ProcessCertificatesFromEac2CvcChainMissing => "Process_Certificates_From_Eac2_Cvc_Chain_Missing",
    DidAuthenticateEac2InvalidCvcChain => "Did_Authenticate_Eac2_Invalid_Cvc_Chain",
    DidAuthenticateEac2CardCommandFailed => "Did_Authenticate_Eac2_Card_Command_Failed",
    GenericSendReceivePaosUnhandled => "Generic_Send_Receive_Paos_Unhandled",
    GenericSendReceiveNetworkError => "Generic_Send_Receive_Network_Error",
    GenericSendReceiveTlsError => "Generic_Send_Receive_Tls_Error",
    GenericSendReceiveServerError => "Generic_Send_Receive_Server_Error",
    GenericSendReceiveClientError => "Generic_Send_Receive_Client_Error",
    GenericSendReceivePaosUnknown => "Generic_Send_Receive_Paos_Unknown",
    GenericSendReceivePaosUnexpected => "Generic_Send_Receive_Paos_Unexpected",
    GenericSendReceiveInvalidEphemeralKeyLength => "Generic_Send_Receive_Invalid_Ephemeral_Key_Length",
    GenericSendReceiveCertificateError => "Generic_Send_Receive_Certificate_Error",
    GenericSendReceiveSessionResumptionFailed => "Generic_Send_Receive_Session_Resumption_Failed",
    TransmitCardCommandFailed => "Transmit_Card_Command_Failed",
    StartPaosResponseMissing => "Start_Paos_Response_Missing",
    StartPaosResponseError => "Start_Paos_Response_Error",
    CheckRefreshAddressFatalTlsErrorBeforeReply => "Check_Refresh_Address_Fatal_Tls_Error_Before_Reply",
    CheckRefreshAddressInvalidEphemeralKeyLength => "Check_Refresh_Address_Invalid_Ephemeral_Key_Length",
    CheckRefreshAddressServiceUnavailable => "Check_Refresh_Address_Service_Unavailable",
    CheckRefreshAddressServiceTimeout => "Check_Refresh_Address_Service_Timeout",
    CheckRefreshAddressProxyError => "Check_Refresh_Address_Proxy_Error",
    CheckRefreshAddressFatalTlsErrorAfterReply => "Check_Refresh_Address_Fatal_Tls_Error_After_Reply",
    CheckRefreshAddressUnknownNetworkError => "Check_Refresh_Address_Unknown_Network_Error",
    CheckRefreshAddressInvalidHttpResponse => "Check_Refresh_Address_Invalid_Http_Response",
    CheckRefreshAddressEmpty => "Check_Refresh_Address_Empty",
    CheckRefreshAddressInvalidUrl => "Check_Refresh_Address_Invalid_Url",
    CheckRefreshAddressNoHttpsScheme => "Check_Refresh_Address_No_Https_Scheme",
    CheckRefreshAddressFetchCertificateError => "Check_Refresh_Address_Fetch_Certificate_Error",
    CheckRefreshAddressUnsupportedCertificate => "Check_Refresh_Address_Unsupported_Certificate",
    CheckRefreshAddressHashMissingInCertificate => "Check_Refresh_Address_Hash_Missing_In_Certificate",
    RedirectBrowserSendErrorPageFailed => "Redirect_Browser_Send_Error_Page_Failed",
    RedirectBrowserSendRedirectFailed => "Redirect_Browser_Send_Redirect_Failed",
    GenericProviderCommunicationNetworkError => "Generic_Provider_Communication_Network_Error",
    GenericProviderCommunicationInvalidEphemeralKeyLength => "Generic_Provider_Communication_Invalid_Ephemeral_Key_Length",
    GenericProviderCommunicationCertificateError => "Generic_Provider_Communication_Certificate_Error",
    GenericProviderCommunicationTlsError => "Generic_Provider_Communication_Tls_Error",
    GetSelfAuthDataInvalidOrEmpty => "Get_SelfAuthData_Invalid_Or_Empty",
    ChangePinNoSetEidPinCommandResponse => "Change_Pin_No_SetEidPinCommand_Response",
    ChangePinInputTimeout => "Change_Pin_Input_Timeout",
    ChangePinUserCancelled => "Change_Pin_User_Cancelled",
    ChangePinNewPinMismatch => "Change_Pin_New_Pin_Mismatch",
    ChangePinNewPinInvalidLength => "Change_Pin_New_Pin_Invalid_Length",
    ChangePinUnexpectedTransmitStatus => "Change_Pin_Unexpected_Transmit_Status",
    ChangePinCardNewPinMismatch => "Change_Pin_Card_New_Pin_Mismatch",
    ChangePinCardUserCancelled => "Change_Pin_Card_User_Cancelled",
    StartIfdServiceFailed => "Start_Ifd_Service_Failed",
    PreparePaceIfdUnknown => "Prepare_Pace_Ifd_Unknown",
    EstablishPaceIfdUnknown => "Establish_Pace_Ifd_Unknown",
    EnterPacePasswordIfdUserCancelled => "Enter_Pace_Password_Ifd_User_Cancelled",
    EnterNewPacePinIfdUserCancelled => "Enter_New_Pace_Pin_Ifd_User_Cancelled",
}

impl FailureCode {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, FailureCode::Unrecognized(_))
    }
}

impl From<String> for FailureCode {
    fn from(wire: String) -> Self {
        FailureCode::catalogued(&wire).unwrap_or(FailureCode::Unrecognized(wire))
    }
}

impl Serialize for FailureCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FailureCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(FailureCode::from)
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
