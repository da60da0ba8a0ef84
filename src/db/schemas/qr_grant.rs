//! QR access grant document schema
//!
//! A grant scopes QR-code access to one deed. The service stores the
//! encrypted payload opaquely and only evaluates the permission rules.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for QR grants
pub const QR_GRANT_COLLECTION: &str = "deed_qrcodes";

/// Who may unlock a grant
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Anyone with the QR code
    #[default]
    Public,
    /// Only addresses in the stored allow-list
    Restricted,
    /// Only current owners of the referenced deed
    OwnerOnly,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Restricted => "restricted",
            Self::OwnerOnly => "owner_only",
        }
    }
}

/// QR grant document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QrGrantDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Generated unique grant identifier (embedded in the QR code)
    pub qr_id: String,

    /// The deed this grant unlocks
    pub deed_id: ObjectId,

    /// Denormalized deed token id, if the deed was tokenized at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<i64>,

    /// Denormalized deed business key
    pub deed_number: String,

    /// Wallet address of the deed owner who created the grant (lowercase)
    pub owner_address: String,

    /// How access is evaluated for this grant
    #[serde(default)]
    pub permission_type: PermissionType,

    /// Allow-list, populated only for `restricted` grants (lowercase)
    #[serde(default)]
    pub allowed_addresses: Vec<String>,

    /// Opaque ciphertext payload the grant unlocks; never decrypted here
    pub encrypted_data: String,
}

impl QrGrantDoc {
    /// Create a new grant with a generated qr_id
    pub fn new(
        deed_id: ObjectId,
        token_id: Option<i64>,
        deed_number: String,
        owner_address: String,
        permission_type: PermissionType,
        allowed_addresses: Vec<String>,
        encrypted_data: String,
    ) -> Self {
        Self {
            id: None,
            metadata: Metadata::new(),
            qr_id: Uuid::new_v4().to_string(),
            deed_id,
            token_id,
            deed_number,
            owner_address: owner_address.to_lowercase(),
            permission_type,
            allowed_addresses: allowed_addresses
                .into_iter()
                .map(|a| a.to_lowercase())
                .collect(),
            encrypted_data,
        }
    }
}

impl IntoIndexes for QrGrantDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "qrId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("qr_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "deedId": 1 },
                Some(
                    IndexOptions::builder()
                        .name("deed_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "ownerAddress": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_address_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for QrGrantDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grant_normalizes_addresses() {
        let grant = QrGrantDoc::new(
            ObjectId::new(),
            Some(7),
            "D-1".into(),
            "0xABC".into(),
            PermissionType::Restricted,
            vec!["0xDEF".into(), "0xGHI".into()],
            "ciphertext".into(),
        );
        assert_eq!(grant.owner_address, "0xabc");
        assert_eq!(grant.allowed_addresses, vec!["0xdef", "0xghi"]);
        assert!(!grant.qr_id.is_empty());
    }

    #[test]
    fn test_permission_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&PermissionType::OwnerOnly).unwrap(),
            "\"owner_only\""
        );
        let parsed: PermissionType = serde_json::from_str("\"restricted\"").unwrap();
        assert_eq!(parsed, PermissionType::Restricted);
    }
}
