//! QR access grant routes
//!
//! Grants wrap an encrypted payload behind one of three permission rules.
//! Scan-side routes are unauthenticated on purpose: a scanner identifies
//! itself by wallet address in the query string, and the permission check
//! decides whether the payload is released.

use bson::doc;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::auth::Claims;
use crate::db::schemas::{DeedDoc, PermissionType, QrGrantDoc};
use crate::deed::{
    check_access, ensure_deed_owner_or_elevated, ensure_grant_owner_or_elevated,
    normalize_allowed_addresses,
};
use crate::routes::{json_response, parse_body};
use crate::server::AppState;
use crate::types::{DeedError, Result};

async fn load_grant(state: &AppState, qr_id: &str) -> Result<QrGrantDoc> {
    state
        .qr_grants
        .find_one(doc! { "qrId": qr_id })
        .await?
        .ok_or_else(|| DeedError::NotFound("QR code not found".into()))
}

async fn load_grant_deed(state: &AppState, grant: &QrGrantDoc) -> Result<Option<DeedDoc>> {
    state.deeds.find_by_id(grant.deed_id).await
}

/// Scanner wallet from the query string. `scannerAddress` is the wire name
/// scanner clients send; `walletAddress` is accepted as an alias.
fn scanner_from_query(query: &HashMap<String, String>) -> Option<&str> {
    query
        .get("scannerAddress")
        .or_else(|| query.get("walletAddress"))
        .map(String::as_str)
}

/// Listing/summary shape: everything except the encrypted payload
fn grant_summary(grant: &QrGrantDoc) -> serde_json::Value {
    serde_json::json!({
        "qrId": grant.qr_id,
        "deedId": grant.deed_id.to_hex(),
        "tokenId": grant.token_id,
        "deedNumber": grant.deed_number,
        "ownerAddress": grant.owner_address,
        "permissionType": grant.permission_type,
        "allowedAddresses": grant.allowed_addresses,
        "createdAt": grant.metadata.created_at,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    deed_id: Option<String>,
    #[serde(default)]
    permission_type: PermissionType,
    allowed_addresses: Option<Vec<String>>,
    encrypted_data: Option<String>,
}

/// POST /api/deeds/qr/generate - create a grant for an owned deed
pub async fn generate_qr(
    state: Arc<AppState>,
    claims: &Claims,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let request: GenerateRequest = parse_body(&body)?;
    let deed_id = request
        .deed_id
        .ok_or_else(|| DeedError::BadRequest("deedId is required".into()))?;
    let encrypted_data = request
        .encrypted_data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| DeedError::BadRequest("encryptedData is required".into()))?;

    let deed_id = bson::oid::ObjectId::parse_str(&deed_id)
        .map_err(|e| DeedError::BadRequest(format!("Invalid deed id: {}", e)))?;
    let deed = state
        .deeds
        .find_by_id(deed_id)
        .await?
        .ok_or_else(|| DeedError::NotFound("Deed not found".into()))?;

    ensure_deed_owner_or_elevated(&deed, claims)?;

    let allowed =
        normalize_allowed_addresses(request.permission_type, request.allowed_addresses)?;
    let grant = QrGrantDoc::new(
        deed_id,
        deed.token_id,
        deed.deed_number.clone(),
        claims.wallet_address.clone(),
        request.permission_type,
        allowed,
        encrypted_data,
    );

    state.qr_grants.insert_one(grant.clone()).await?;

    info!(
        qr_id = %grant.qr_id,
        deed_id = %deed_id,
        permission = grant.permission_type.as_str(),
        "QR grant created"
    );

    Ok(json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "success": true, "qrCode": grant_summary(&grant) }),
    ))
}

/// GET /api/deeds/qr/:qrId/permissions - evaluate access without releasing data
pub async fn check_qr_permissions(
    state: Arc<AppState>,
    qr_id: &str,
    query: &HashMap<String, String>,
) -> Result<Response<Full<Bytes>>> {
    let grant = load_grant(&state, qr_id).await?;
    let deed = load_grant_deed(&state, &grant).await?;
    let scanner = scanner_from_query(query);

    let decision = check_access(&grant, deed.as_ref(), scanner);

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "success": true,
            "hasAccess": decision.has_access,
            "reason": decision.reason,
            "permissionType": grant.permission_type,
            "qrId": grant.qr_id,
        }),
    ))
}

/// GET /api/deeds/qr/:qrId/deed - release deed and payload when access passes
pub async fn get_qr_deed(
    state: Arc<AppState>,
    qr_id: &str,
    query: &HashMap<String, String>,
) -> Result<Response<Full<Bytes>>> {
    let grant = load_grant(&state, qr_id).await?;
    let deed = load_grant_deed(&state, &grant).await?;
    let scanner = scanner_from_query(query);

    let decision = check_access(&grant, deed.as_ref(), scanner);
    if !decision.has_access {
        return Ok(json_response(
            StatusCode::FORBIDDEN,
            &serde_json::json!({
                "success": false,
                "hasAccess": false,
                "reason": decision.reason,
            }),
        ));
    }

    let deed = deed.ok_or_else(|| DeedError::NotFound("Deed not found".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "success": true,
            "hasAccess": true,
            "reason": decision.reason,
            "deed": deed,
            "encryptedData": grant.encrypted_data,
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePermissionsRequest {
    permission_type: Option<PermissionType>,
    allowed_addresses: Option<Vec<String>>,
}

/// PUT /api/deeds/qr/:qrId/permissions - change the permission rule
pub async fn update_qr_permissions(
    state: Arc<AppState>,
    claims: &Claims,
    qr_id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let request: UpdatePermissionsRequest = parse_body(&body)?;
    let permission_type = request
        .permission_type
        .ok_or_else(|| DeedError::BadRequest("permissionType is required".into()))?;

    let mut grant = load_grant(&state, qr_id).await?;
    ensure_grant_owner_or_elevated(&grant, claims)?;

    grant.permission_type = permission_type;
    grant.allowed_addresses =
        normalize_allowed_addresses(permission_type, request.allowed_addresses)?;

    state
        .qr_grants
        .replace_one(doc! { "qrId": qr_id }, grant.clone())
        .await?;

    info!(qr_id, permission = permission_type.as_str(), "QR grant permissions updated");

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "success": true, "qrCode": grant_summary(&grant) }),
    ))
}

/// DELETE /api/deeds/qr/:qrId - revoke a grant
pub async fn delete_qr(
    state: Arc<AppState>,
    claims: &Claims,
    qr_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let grant = load_grant(&state, qr_id).await?;
    ensure_grant_owner_or_elevated(&grant, claims)?;

    state.qr_grants.delete_one(doc! { "qrId": qr_id }).await?;

    info!(qr_id, "QR grant deleted");
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "success": true, "message": "QR code deleted" }),
    ))
}

/// GET /api/deeds/qr/my - grants created by the caller
pub async fn my_qrcodes(state: Arc<AppState>, claims: &Claims) -> Result<Response<Full<Bytes>>> {
    let grants = state
        .qr_grants
        .find_many(doc! { "ownerAddress": claims.wallet_lowercase() })
        .await?;

    let summaries: Vec<_> = grants.iter().map(grant_summary).collect();
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "success": true, "qrCodes": summaries }),
    ))
}

/// GET /api/deeds/:deedId/qrcodes - grants for one deed, owner/admin gated
pub async fn qrcodes_by_deed(
    state: Arc<AppState>,
    claims: &Claims,
    deed_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let deed_id = bson::oid::ObjectId::parse_str(deed_id)
        .map_err(|e| DeedError::BadRequest(format!("Invalid deed id: {}", e)))?;
    let deed = state
        .deeds
        .find_by_id(deed_id)
        .await?
        .ok_or_else(|| DeedError::NotFound("Deed not found".into()))?;

    ensure_deed_owner_or_elevated(&deed, claims)?;

    let grants = state
        .qr_grants
        .find_many(doc! { "deedId": deed_id })
        .await?;

    let summaries: Vec<_> = grants.iter().map(grant_summary).collect();
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "success": true, "qrCodes": summaries }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Owner, PermissionType};
    use crate::routes::parse_query_params;
    use bson::oid::ObjectId;

    #[test]
    fn test_scanner_read_from_scanner_address_param() {
        let query = parse_query_params("scannerAddress=0xAbC");
        assert_eq!(scanner_from_query(&query), Some("0xAbC"));
    }

    #[test]
    fn test_scanner_wallet_address_alias_accepted() {
        let query = parse_query_params("walletAddress=0xDeF");
        assert_eq!(scanner_from_query(&query), Some("0xDeF"));

        // Wire name wins when both are present
        let query = parse_query_params("walletAddress=0xDeF&scannerAddress=0xAbC");
        assert_eq!(scanner_from_query(&query), Some("0xAbC"));

        assert_eq!(scanner_from_query(&parse_query_params("")), None);
    }

    #[test]
    fn test_restricted_scan_granted_via_scanner_address_param() {
        let grant = QrGrantDoc::new(
            ObjectId::new(),
            None,
            "D-1".into(),
            "0xowner".into(),
            PermissionType::Restricted,
            vec!["0xAAA".into()],
            "ciphertext".into(),
        );
        let mut deed = DeedDoc::sample();
        deed.owners = vec![Owner {
            address: "0xccc".into(),
            share: 100.0,
        }];

        let query = parse_query_params("scannerAddress=0xAAA");
        let decision = check_access(&grant, Some(&deed), scanner_from_query(&query));
        assert!(decision.has_access);

        // Scanner omitting the param entirely is denied, not granted
        let decision = check_access(&grant, Some(&deed), scanner_from_query(&parse_query_params("")));
        assert!(!decision.has_access);
    }
}
