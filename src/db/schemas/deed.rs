//! Deed document schema
//!
//! The central entity of the registry: descriptive land attributes, the
//! current owner list, the append-only title/valuation/survey-plan ledgers
//! and the three role signature slots.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for deeds
pub const DEED_COLLECTION: &str = "deeds";

/// Legal deed categories
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeedCategory {
    #[serde(rename = "Power of Attorney")]
    PowerOfAttorney,
    Gift,
    Sale,
    Exchange,
    Lease,
    Mortgage,
    #[serde(rename = "Partition Deed")]
    PartitionDeed,
    #[serde(rename = "Last Will")]
    LastWill,
    #[serde(rename = "Trust Deed")]
    TrustDeed,
    #[serde(rename = "Settlement Deed")]
    SettlementDeed,
    #[serde(rename = "Declaration of Trust")]
    DeclarationOfTrust,
    #[serde(rename = "Agreement to Sell")]
    AgreementToSell,
    #[serde(rename = "Conditional Transfer")]
    ConditionalTransfer,
    #[serde(rename = "Transfer Deed")]
    TransferDeed,
    #[serde(rename = "Deed of Assignment")]
    DeedOfAssignment,
    #[serde(rename = "Deed of Disclaimer")]
    DeedOfDisclaimer,
    #[serde(rename = "Deed of Rectification")]
    DeedOfRectification,
    #[serde(rename = "Deed of Cancellation")]
    DeedOfCancellation,
    #[serde(rename = "Deed of Surrender")]
    DeedOfSurrender,
    #[serde(rename = "Deed of Release")]
    DeedOfRelease,
    #[serde(rename = "Deed of Nomination")]
    DeedOfNomination,
    Affidavit,
    #[serde(rename = "Court Order / Judgment")]
    CourtOrder,
    Other,
}

/// Land classification
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandType {
    #[serde(rename = "Paddy land")]
    PaddyLand,
    Highland,
    Residential,
}

/// Unit for land area measurements
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LandSizeUnit {
    #[default]
    Perches,
    Acres,
    Hectares,
    Sqm,
    Sqft,
}

/// Deed category plus the legal deed number it was issued under
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeedTypeInfo {
    pub deed_type: DeedCategory,
    pub deed_number: String,
}

/// One entry in the immutable title ledger
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleRecord {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub share: f64,
    pub timestamp: i64,
}

/// Current owner entry
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub address: String,
    pub share: f64,
}

/// One entry in the valuation ledger.
///
/// Only the last entry may be mutated in place (to fill an outstanding
/// estimate); earlier entries are frozen once a later one exists.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRecord {
    pub requested_value: Option<f64>,
    pub estimated_value: Option<f64>,
    pub is_accepted: Option<bool>,
    pub timestamp: i64,
}

/// One attached survey plan
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPlan {
    pub plan_id: String,
    pub timestamp: i64,
}

/// Geographic boundary point
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Free-text description of what lies on each side of the land
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Sides {
    #[serde(rename = "North", skip_serializing_if = "Option::is_none")]
    pub north: Option<String>,
    #[serde(rename = "South", skip_serializing_if = "Option::is_none")]
    pub south: Option<String>,
    #[serde(rename = "East", skip_serializing_if = "Option::is_none")]
    pub east: Option<String>,
    #[serde(rename = "West", skip_serializing_if = "Option::is_none")]
    pub west: Option<String>,
}

/// Deed document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeedDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Externally visible unique business key, immutable after creation
    pub deed_number: String,

    /// Legal category of the deed
    pub deed_type: DeedTypeInfo,

    /// Registered monetary value
    pub value: f64,

    /// Current owners; replaced wholesale by ownership transfers
    #[serde(default)]
    pub owners: Vec<Owner>,

    /// Immutable audit trail of ownership/value movements
    #[serde(default)]
    pub title: Vec<TitleRecord>,

    /// Valuation ledger (append-only, last entry mutable)
    #[serde(default)]
    pub valuation: Vec<ValuationRecord>,

    /// Attached survey plans (append-only)
    #[serde(default)]
    pub survey_plans: Vec<SurveyPlan>,

    /// Boundary polygon
    #[serde(default)]
    pub location: Vec<LocationPoint>,

    /// Neighbouring descriptions per compass side
    #[serde(default)]
    pub sides: Sides,

    pub land_type: LandType,
    #[serde(default)]
    pub land_size_unit: LandSizeUnit,
    pub land_title_number: String,
    pub land_address: String,
    pub land_area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_plan_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<String>,

    pub district: String,
    pub division: String,
    pub registration_date: String,
    pub timestamp: i64,

    /// Denormalized owner contact details
    pub owner_full_name: String,
    pub owner_nic: String,
    pub owner_address: String,
    pub owner_phone: String,

    /// Role assignments (wallet addresses) and their signature slots.
    /// A signature stays None until the assigned role-holder signs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_assigned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notary_assigned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notary_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ivsl_assigned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ivsl_signature: Option<String>,

    /// External-ledger correlation id, set once after tokenization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<i64>,
}

impl DeedDoc {
    /// Whether the given wallet address is a current owner (case-insensitive)
    pub fn is_owned_by(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.owners
            .iter()
            .any(|owner| owner.address.to_lowercase() == address)
    }

    /// Minimal well-formed deed for unit tests
    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        DeedDoc {
            id: None,
            metadata: Metadata::default(),
            deed_number: "D-2024-001".into(),
            deed_type: DeedTypeInfo {
                deed_type: DeedCategory::Sale,
                deed_number: "D-2024-001".into(),
            },
            value: 1_000_000.0,
            owners: vec![Owner {
                address: "0xaaa".into(),
                share: 100.0,
            }],
            title: vec![],
            valuation: vec![],
            survey_plans: vec![],
            location: vec![],
            sides: Sides::default(),
            land_type: LandType::Highland,
            land_size_unit: LandSizeUnit::Perches,
            land_title_number: "LT-17".into(),
            land_address: "12 Temple Road".into(),
            land_area: 40.0,
            survey_plan_number: None,
            boundaries: None,
            district: "Colombo".into(),
            division: "Homagama".into(),
            registration_date: "2024-03-01".into(),
            timestamp: 1_709_251_200,
            owner_full_name: "A. Perera".into(),
            owner_nic: "901234567V".into(),
            owner_address: "12 Temple Road".into(),
            owner_phone: "+94110000000".into(),
            survey_assigned: None,
            survey_signature: None,
            notary_assigned: None,
            notary_signature: None,
            ivsl_assigned: None,
            ivsl_signature: None,
            token_id: None,
        }
    }
}

impl IntoIndexes for DeedDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the business key
            (
                doc! { "deedNumber": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("deed_number_unique".to_string())
                        .build(),
                ),
            ),
            // Token id lookups for ownership transfers
            (
                doc! { "tokenId": 1 },
                Some(
                    IndexOptions::builder()
                        .name("token_id_index".to_string())
                        .build(),
                ),
            ),
            // Role dashboards query by assigned wallet
            (
                doc! { "surveyAssigned": 1 },
                Some(
                    IndexOptions::builder()
                        .name("survey_assigned_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "owners.address": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_address_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for DeedDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deed_category_wire_names() {
        let json = serde_json::to_string(&DeedCategory::PowerOfAttorney).unwrap();
        assert_eq!(json, "\"Power of Attorney\"");
        let parsed: DeedCategory = serde_json::from_str("\"Court Order / Judgment\"").unwrap();
        assert_eq!(parsed, DeedCategory::CourtOrder);
    }

    #[test]
    fn test_land_size_unit_defaults_to_perches() {
        assert_eq!(LandSizeUnit::default(), LandSizeUnit::Perches);
    }

    #[test]
    fn test_is_owned_by_case_insensitive() {
        let mut deed = DeedDoc::sample();
        deed.owners = vec![Owner {
            address: "0xABCDEF".into(),
            share: 100.0,
        }];
        assert!(deed.is_owned_by("0xabcdef"));
        assert!(!deed.is_owned_by("0x123456"));
    }

    #[test]
    fn test_deed_round_trips_through_bson() {
        let deed = DeedDoc::sample();
        let doc = bson::to_document(&deed).unwrap();
        assert!(doc.contains_key("deedNumber"));
        assert!(doc.contains_key("landTitleNumber"));
        let back: DeedDoc = bson::from_document(doc).unwrap();
        assert_eq!(back.deed_number, deed.deed_number);
        assert_eq!(back.owners, deed.owners);
    }
}
