//! Ownership transfer
//!
//! This registry only models full transfers: the incoming owner takes 100%
//! regardless of how the previous owner list was split. Partial re-assignment
//! goes through the title ledger, not through owner replacement.

use serde::{Deserialize, Serialize};

use crate::db::schemas::{DeedDoc, Owner};
use crate::types::{DeedError, Result};

/// Sentinel stored for contact fields the caller did not supply
pub const UNSET: &str = "unset";

/// Caller-supplied transfer details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerTransfer {
    pub new_owner_address: Option<String>,
    #[serde(default)]
    pub owner_full_name: Option<String>,
    #[serde(default)]
    pub owner_nic: Option<String>,
    #[serde(default)]
    pub owner_address: Option<String>,
    #[serde(default)]
    pub owner_phone: Option<String>,
    /// Transfer amount, forwarded to the transaction service in the
    /// full-transfer variant
    #[serde(default)]
    pub amount: Option<f64>,
    /// External transaction hash, forwarded likewise
    #[serde(default)]
    pub hash: Option<String>,
}

/// Replace the deed's owners with the new single owner at 100% share.
///
/// Contact fields are overwritten wholesale; unsupplied ones get the
/// [`UNSET`] sentinel rather than keeping the previous owner's details.
/// Returns the previous primary owner's address for the transaction record.
pub fn apply_transfer(deed: &mut DeedDoc, transfer: &OwnerTransfer) -> Result<String> {
    let new_owner = transfer
        .new_owner_address
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DeedError::BadRequest("newOwnerAddress is required".into()))?;

    let previous_owner = deed
        .owners
        .first()
        .map(|o| o.address.clone())
        .unwrap_or_else(|| "system".to_string());

    deed.owners = vec![Owner {
        address: new_owner.to_string(),
        share: 100.0,
    }];

    let field = |value: &Option<String>| {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNSET.to_string())
    };
    deed.owner_full_name = field(&transfer.owner_full_name);
    deed.owner_nic = field(&transfer.owner_nic);
    deed.owner_address = field(&transfer.owner_address);
    deed.owner_phone = field(&transfer.owner_phone);

    Ok(previous_owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_replaces_owner_list_wholesale() {
        let mut deed = DeedDoc::sample();
        deed.owners = vec![
            Owner {
                address: "0xaaa".into(),
                share: 60.0,
            },
            Owner {
                address: "0xbbb".into(),
                share: 40.0,
            },
        ];

        let from = apply_transfer(
            &mut deed,
            &OwnerTransfer {
                new_owner_address: Some("0xccc".into()),
                owner_full_name: Some("B. Silva".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(from, "0xaaa");
        assert_eq!(deed.owners.len(), 1);
        assert_eq!(deed.owners[0].address, "0xccc");
        assert_eq!(deed.owners[0].share, 100.0);
    }

    #[test]
    fn test_unsupplied_contact_fields_get_sentinel() {
        let mut deed = DeedDoc::sample();

        apply_transfer(
            &mut deed,
            &OwnerTransfer {
                new_owner_address: Some("0xccc".into()),
                owner_phone: Some("+94770000000".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(deed.owner_phone, "+94770000000");
        assert_eq!(deed.owner_full_name, UNSET);
        assert_eq!(deed.owner_nic, UNSET);
        assert_eq!(deed.owner_address, UNSET);
    }

    #[test]
    fn test_missing_new_owner_rejected() {
        let mut deed = DeedDoc::sample();
        let before = deed.owners.clone();

        assert!(matches!(
            apply_transfer(&mut deed, &OwnerTransfer::default()),
            Err(DeedError::BadRequest(_))
        ));
        assert!(matches!(
            apply_transfer(
                &mut deed,
                &OwnerTransfer {
                    new_owner_address: Some(String::new()),
                    ..Default::default()
                }
            ),
            Err(DeedError::BadRequest(_))
        ));
        assert_eq!(deed.owners, before);
    }

    #[test]
    fn test_transfer_from_ownerless_deed_uses_system() {
        let mut deed = DeedDoc::sample();
        deed.owners.clear();

        let from = apply_transfer(
            &mut deed,
            &OwnerTransfer {
                new_owner_address: Some("0xccc".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(from, "system");
    }
}
