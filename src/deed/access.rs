//! QR grant access evaluation
//!
//! Pure decision functions over a loaded grant (and, for owner-only grants,
//! the live deed). `owner_only` is re-evaluated against current owners each
//! call so transferring a deed immediately re-scopes its grants; `restricted`
//! is frozen to the allow-list stored at grant-update time.

use serde::Serialize;

use crate::auth::Claims;
use crate::db::schemas::{DeedDoc, PermissionType, QrGrantDoc};
use crate::types::{DeedError, Result};

/// Outcome of an access evaluation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub has_access: bool,
    pub reason: String,
}

impl AccessDecision {
    fn granted(reason: &str) -> Self {
        Self {
            has_access: true,
            reason: reason.to_string(),
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            has_access: false,
            reason: reason.to_string(),
        }
    }
}

/// Evaluate whether a scanner may unlock a grant. Never mutates state.
///
/// `deed` is the referenced deed as currently stored, needed only for
/// owner-only grants (pass whatever the lookup returned).
pub fn check_access(
    grant: &QrGrantDoc,
    deed: Option<&DeedDoc>,
    scanner_address: Option<&str>,
) -> AccessDecision {
    match grant.permission_type {
        PermissionType::Public => AccessDecision::granted("Public QR code"),

        PermissionType::OwnerOnly => {
            let scanner = match scanner_address {
                Some(s) if !s.is_empty() => s.to_lowercase(),
                _ => {
                    return AccessDecision::denied("Owner-only QR code requires wallet address")
                }
            };

            match deed {
                Some(deed) if deed.is_owned_by(&scanner) => {
                    AccessDecision::granted("You are an owner of this deed")
                }
                Some(_) => AccessDecision::denied("You are not an owner of this deed"),
                None => AccessDecision::denied("Deed not found"),
            }
        }

        PermissionType::Restricted => {
            let scanner = match scanner_address {
                Some(s) if !s.is_empty() => s.to_lowercase(),
                _ => {
                    return AccessDecision::denied("Restricted QR code requires wallet address")
                }
            };

            if grant.allowed_addresses.contains(&scanner) {
                AccessDecision::granted("Your address is in the allowed list")
            } else {
                AccessDecision::denied("Your address is not in the allowed list")
            }
        }
    }
}

/// Normalize and validate the allow-list for a create/update request.
///
/// A restricted grant requires a non-empty list; other permission types
/// store an empty list. Addresses are lowercased at write time so later
/// comparisons are case-insensitive without re-normalizing.
pub fn normalize_allowed_addresses(
    permission_type: PermissionType,
    allowed_addresses: Option<Vec<String>>,
) -> Result<Vec<String>> {
    if permission_type != PermissionType::Restricted {
        return Ok(Vec::new());
    }

    let addresses = allowed_addresses.unwrap_or_default();
    if addresses.is_empty() {
        return Err(DeedError::BadRequest(
            "allowedAddresses is required when permissionType is 'restricted'".into(),
        ));
    }

    Ok(addresses.into_iter().map(|a| a.to_lowercase()).collect())
}

/// Grant creation is restricted to the deed's owners and elevated roles
pub fn ensure_deed_owner_or_elevated(deed: &DeedDoc, caller: &Claims) -> Result<()> {
    if deed.is_owned_by(&caller.wallet_address) || caller.role.is_elevated() {
        return Ok(());
    }

    Err(DeedError::Forbidden(
        "You are not an owner of this deed".into(),
    ))
}

/// Grant mutation is restricted to the grant's creator and elevated roles
pub fn ensure_grant_owner_or_elevated(grant: &QrGrantDoc, caller: &Claims) -> Result<()> {
    if grant.owner_address == caller.wallet_lowercase() || caller.role.is_elevated() {
        return Ok(());
    }

    Err(DeedError::Forbidden(
        "You are not the owner of this QR code".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::schemas::Owner;
    use bson::oid::ObjectId;

    fn grant(permission_type: PermissionType, allowed: Vec<&str>) -> QrGrantDoc {
        QrGrantDoc::new(
            ObjectId::new(),
            None,
            "D-1".into(),
            "0xowner".into(),
            permission_type,
            allowed.into_iter().map(String::from).collect(),
            "ciphertext".into(),
        )
    }

    fn claims(wallet: &str, role: Role) -> Claims {
        Claims {
            wallet_address: wallet.into(),
            identifier: "test".into(),
            role,
            iat: 0,
            exp: u64::MAX,
        }
    }

    #[test]
    fn test_public_always_granted() {
        let g = grant(PermissionType::Public, vec![]);
        assert!(check_access(&g, None, None).has_access);
        assert!(check_access(&g, None, Some("0xanyone")).has_access);
    }

    #[test]
    fn test_owner_only_requires_scanner_address() {
        let g = grant(PermissionType::OwnerOnly, vec![]);
        let deed = DeedDoc::sample();
        assert!(!check_access(&g, Some(&deed), None).has_access);
        assert!(!check_access(&g, Some(&deed), Some("")).has_access);
    }

    #[test]
    fn test_owner_only_tracks_live_ownership() {
        let g = grant(PermissionType::OwnerOnly, vec![]);
        let mut deed = DeedDoc::sample();
        deed.owners = vec![Owner {
            address: "0xAAA".into(),
            share: 100.0,
        }];

        assert!(check_access(&g, Some(&deed), Some("0xaaa")).has_access);

        // Transfer ownership away: access revoked without touching the grant
        deed.owners = vec![Owner {
            address: "0xbbb".into(),
            share: 100.0,
        }];
        assert!(!check_access(&g, Some(&deed), Some("0xaaa")).has_access);
        assert!(check_access(&g, Some(&deed), Some("0xBBB")).has_access);
    }

    #[test]
    fn test_owner_only_with_missing_deed_denied() {
        let g = grant(PermissionType::OwnerOnly, vec![]);
        assert!(!check_access(&g, None, Some("0xaaa")).has_access);
    }

    #[test]
    fn test_restricted_frozen_to_stored_list() {
        let g = grant(PermissionType::Restricted, vec!["0xAAA", "0xBBB"]);
        let mut deed = DeedDoc::sample();
        deed.owners = vec![Owner {
            address: "0xccc".into(),
            share: 100.0,
        }];

        // List was normalized at write time; comparison is case-insensitive
        assert!(check_access(&g, Some(&deed), Some("0xAaA")).has_access);
        // Current owner is not in the list: ownership does not matter here
        assert!(!check_access(&g, Some(&deed), Some("0xccc")).has_access);
        assert!(!check_access(&g, Some(&deed), None).has_access);
    }

    #[test]
    fn test_normalize_allowed_addresses() {
        let normalized =
            normalize_allowed_addresses(PermissionType::Restricted, Some(vec!["0xABC".into()]))
                .unwrap();
        assert_eq!(normalized, vec!["0xabc"]);

        assert!(normalize_allowed_addresses(PermissionType::Restricted, None).is_err());
        assert!(normalize_allowed_addresses(PermissionType::Restricted, Some(vec![])).is_err());

        // Non-restricted grants drop any supplied list
        let empty =
            normalize_allowed_addresses(PermissionType::Public, Some(vec!["0xabc".into()]))
                .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_deed_owner_gate() {
        let deed = DeedDoc::sample(); // owned by 0xaaa

        assert!(ensure_deed_owner_or_elevated(&deed, &claims("0xAAA", Role::User)).is_ok());
        assert!(ensure_deed_owner_or_elevated(&deed, &claims("0xbbb", Role::User)).is_err());
        assert!(ensure_deed_owner_or_elevated(&deed, &claims("0xbbb", Role::Registrar)).is_ok());
        assert!(ensure_deed_owner_or_elevated(&deed, &claims("0xbbb", Role::Admin)).is_ok());
    }

    #[test]
    fn test_grant_owner_gate() {
        let g = grant(PermissionType::Public, vec![]);

        assert!(ensure_grant_owner_or_elevated(&g, &claims("0xOWNER", Role::User)).is_ok());
        assert!(ensure_grant_owner_or_elevated(&g, &claims("0xother", Role::User)).is_err());
        assert!(ensure_grant_owner_or_elevated(&g, &claims("0xother", Role::Admin)).is_ok());
    }
}
