//! Access rights a provider can request during an authentication.

use serde::{Deserialize, Serialize};

/// A single access right.
///
/// See <https://www.ausweisapp.bund.de/sdk/messages.html#values>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessRight {
    Address,
    BirthName,
    FamilyName,
    GivenNames,
    PlaceOfBirth,
    DateOfBirth,
    DoctoralDegree,
    ArtisticName,
    Pseudonym,
    ValidUntil,
    Nationality,
    IssuingCountry,
    DocumentType,
    ResidencePermitI,
    ResidencePermitII,
    #[serde(rename = "CommunityID")]
    CommunityId,
    AddressVerification,
    AgeVerification,
    WriteAddress,
    #[serde(rename = "WriteCommunityID")]
    WriteCommunityId,
    WriteResidencePermitI,
    WriteResidencePermitII,
    CanAllowed,
    PinManagement,
}
