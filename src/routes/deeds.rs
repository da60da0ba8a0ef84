//! Deed CRUD, signing, valuation, ownership and plan routes
//!
//! Handlers load the deed, apply a domain transition and persist with one
//! save. Downstream notifications (queue events, transaction records) are
//! spawned detached so they never gate the response.

use bson::{doc, oid::ObjectId};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::Claims;
use crate::db::schemas::{DeedDoc, SurveyPlan, TitleRecord};
use crate::deed::{apply_transfer, apply_valuation, OwnerTransfer, ValuationMode, ValuationUpdate};
use crate::nats::DeedEvent;
use crate::routes::{json_response, parse_body};
use crate::server::AppState;
use crate::services::TransactionRecord;
use crate::signing::{apply_signature, SignerRole};
use crate::types::{DeedError, Result};

/// Parse a path segment as a Mongo object id
fn parse_object_id(s: &str) -> Result<ObjectId> {
    ObjectId::parse_str(s).map_err(|e| DeedError::BadRequest(format!("Invalid deed id: {}", e)))
}

async fn load_deed(state: &AppState, id: ObjectId) -> Result<DeedDoc> {
    state
        .deeds
        .find_by_id(id)
        .await?
        .ok_or_else(|| DeedError::NotFound("Deed not found".into()))
}

/// POST /api/deeds - create a deed
pub async fn create_deed(state: Arc<AppState>, body: Bytes) -> Result<Response<Full<Bytes>>> {
    let mut deed: DeedDoc = parse_body(&body)?;
    deed.id = None;

    let id = state.deeds.insert_one(deed).await?;
    let deed = load_deed(&state, id).await?;

    info!(deed_id = %id, deed_number = %deed.deed_number, "Deed created");

    let now = chrono::Utc::now().timestamp();

    // Advisory side effects, never awaited by the response path
    if let Some(ref producer) = state.producer {
        producer.publish_detached(DeedEvent::DeedCreated {
            deed_id: id.to_hex(),
            deed_number: deed.deed_number.clone(),
            timestamp: now,
        });
    }
    if let Some(owner) = deed.owners.first() {
        state.transactions.record_detached(TransactionRecord::deed_created(
            &id.to_hex(),
            &owner.address,
            None,
            0.0,
        ));
    }

    Ok(json_response(StatusCode::CREATED, &deed))
}

/// GET /api/deeds - list all deeds
pub async fn list_deeds(state: Arc<AppState>) -> Result<Response<Full<Bytes>>> {
    let deeds = state.deeds.find_many(doc! {}).await?;
    Ok(json_response(StatusCode::OK, &deeds))
}

/// GET /api/deeds/:id - fetch one deed
pub async fn get_deed(state: Arc<AppState>, id: &str) -> Result<Response<Full<Bytes>>> {
    let deed = load_deed(&state, parse_object_id(id)?).await?;
    Ok(json_response(StatusCode::OK, &deed))
}

/// GET /api/deeds/deed/:deedNumber - fetch by business key, owner/admin gated
pub async fn get_deed_by_number(
    state: Arc<AppState>,
    claims: &Claims,
    deed_number: &str,
) -> Result<Response<Full<Bytes>>> {
    let deed = state
        .deeds
        .find_one(doc! { "deedNumber": deed_number })
        .await?
        .ok_or_else(|| DeedError::NotFound("Deed not found".into()))?;

    if !deed.is_owned_by(&claims.wallet_address) && !claims.role.is_elevated() {
        return Err(DeedError::Forbidden(
            "You are not an owner of this deed".into(),
        ));
    }

    Ok(json_response(StatusCode::OK, &deed))
}

/// Fields the partial-update route may never touch. Identity and
/// bookkeeping fields are immutable; the token binding is set-once through
/// the dedicated set-token operation.
fn strip_immutable_fields(update: &mut bson::Document) {
    update.remove("_id");
    update.remove("metadata");
    update.remove("deedNumber");
    update.remove("tokenId");
}

/// PUT /api/deeds/:id - partial update of descriptive attributes
pub async fn update_deed(
    state: Arc<AppState>,
    id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let value: serde_json::Value = parse_body(&body)?;
    let mut update = bson::to_document(&value)
        .map_err(|e| DeedError::BadRequest(format!("Invalid update body: {}", e)))?;

    strip_immutable_fields(&mut update);

    if update.is_empty() {
        return Err(DeedError::BadRequest("No updatable fields supplied".into()));
    }

    let id = parse_object_id(id)?;
    let result = state
        .deeds
        .update_one(
            doc! { "_id": id },
            doc! {
                "$set": update,
                "$currentDate": { "metadata.updatedAt": true },
            },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(DeedError::NotFound("Deed not found".into()));
    }

    let deed = load_deed(&state, id).await?;
    Ok(json_response(StatusCode::OK, &deed))
}

/// DELETE /api/deeds/:id
pub async fn delete_deed(state: Arc<AppState>, id: &str) -> Result<Response<Full<Bytes>>> {
    let id = parse_object_id(id)?;
    let result = state.deeds.delete_one(doc! { "_id": id }).await?;

    if result.deleted_count == 0 {
        return Err(DeedError::NotFound("Deed not found".into()));
    }

    info!(deed_id = %id, "Deed deleted");
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "Deed deleted" }),
    ))
}

/// Role slot echoed by the signing route
#[derive(Serialize)]
struct RoleSlot<'a> {
    assigned: Option<&'a str>,
    signature: Option<&'a str>,
}

#[derive(Deserialize)]
struct SignRequest {
    signature: Option<String>,
}

/// POST /api/deeds/:id/sign/:type - attach a role signature
pub async fn sign_deed(
    state: Arc<AppState>,
    id: &str,
    role: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let role: SignerRole = role.parse()?;
    let request: SignRequest = parse_body(&body)?;
    let signature = request
        .signature
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeedError::BadRequest("signature is required".into()))?;

    let id = parse_object_id(id)?;
    let mut deed = load_deed(&state, id).await?;

    apply_signature(&mut deed, role, &signature)?;
    state
        .deeds
        .replace_one(doc! { "_id": id }, deed.clone())
        .await?;

    info!(deed_id = %id, role = %role, "Role signature attached");

    let echo = serde_json::json!({
        "id": id.to_hex(),
        "deed": &deed,
        "signatures": {
            "survey": RoleSlot {
                assigned: deed.survey_assigned.as_deref(),
                signature: deed.survey_signature.as_deref(),
            },
            "notary": RoleSlot {
                assigned: deed.notary_assigned.as_deref(),
                signature: deed.notary_signature.as_deref(),
            },
            "ivsl": RoleSlot {
                assigned: deed.ivsl_assigned.as_deref(),
                signature: deed.ivsl_signature.as_deref(),
            },
        },
    });

    Ok(json_response(StatusCode::OK, &echo))
}

#[derive(Deserialize)]
struct ValuationRequest {
    mode: Option<String>,
    #[serde(flatten)]
    update: ValuationUpdate,
}

/// POST /api/deeds/ivsl/:id - apply a valuation update
pub async fn update_valuation(
    state: Arc<AppState>,
    id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let request: ValuationRequest = parse_body(&body)?;
    let mode: ValuationMode = request
        .mode
        .as_deref()
        .ok_or_else(|| DeedError::BadRequest("mode is required".into()))?
        .parse()?;

    let id = parse_object_id(id)?;
    let mut deed = load_deed(&state, id).await?;

    let entry = apply_valuation(
        &mut deed,
        mode,
        &request.update,
        chrono::Utc::now().timestamp(),
    )?;
    state
        .deeds
        .replace_one(doc! { "_id": id }, deed.clone())
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "valuation": entry, "deed": deed }),
    ))
}

/// Shared body of the two ownership-transfer routes
async fn transfer_ownership(
    state: &Arc<AppState>,
    token_id: &str,
    body: Bytes,
    with_transaction: bool,
) -> Result<Response<Full<Bytes>>> {
    let token_id: i64 = token_id
        .parse()
        .map_err(|_| DeedError::BadRequest("Invalid token id".into()))?;

    let transfer: OwnerTransfer = parse_body(&body)?;

    let mut deed = state
        .deeds
        .find_one(doc! { "tokenId": token_id })
        .await?
        .ok_or_else(|| DeedError::NotFound("Deed not found for token".into()))?;
    let id = deed
        .id
        .ok_or_else(|| DeedError::Internal("Stored deed missing _id".into()))?;

    let previous_owner = apply_transfer(&mut deed, &transfer)?;
    state
        .deeds
        .replace_one(doc! { "_id": id }, deed.clone())
        .await?;

    let new_owner = deed.owners[0].address.clone();
    info!(
        deed_id = %id,
        token_id,
        from = %previous_owner,
        to = %new_owner,
        "Ownership transferred"
    );

    if with_transaction {
        // Advisory: the deed update above is the source of truth
        state.transactions.record_detached(TransactionRecord::full_transfer(
            &id.to_hex(),
            &previous_owner,
            &new_owner,
            transfer.hash.clone(),
            transfer.amount.unwrap_or(0.0),
        ));

        if let Some(ref producer) = state.producer {
            producer.publish_detached(DeedEvent::OwnershipTransferred {
                deed_id: id.to_hex(),
                from: previous_owner,
                to: new_owner,
                timestamp: chrono::Utc::now().timestamp(),
            });
        }
    }

    Ok(json_response(StatusCode::OK, &deed))
}

/// PUT /api/deeds/update-owner/:tokenId - simple ownership transfer
pub async fn update_owner(
    state: Arc<AppState>,
    token_id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    transfer_ownership(&state, token_id, body, false).await
}

/// PUT /api/deeds/update-full-owner/:tokenId - transfer plus transaction record
pub async fn update_full_owner(
    state: Arc<AppState>,
    token_id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    transfer_ownership(&state, token_id, body, true).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertPlanRequest {
    plan_id: Option<String>,
}

/// POST /api/deeds/:id/plan - append a survey plan
///
/// Uses an atomic server-side push so concurrent plan inserts cannot lose
/// each other, unlike the load-mutate-save workflows.
pub async fn insert_plan(
    state: Arc<AppState>,
    id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let request: InsertPlanRequest = parse_body(&body)?;
    let plan_id = request
        .plan_id
        .filter(|p| !p.is_empty())
        .ok_or_else(|| DeedError::BadRequest("planId is required".into()))?;

    let id = parse_object_id(id)?;
    let plan = SurveyPlan {
        plan_id,
        timestamp: chrono::Utc::now().timestamp(),
    };
    let value = bson::to_bson(&plan).map_err(|e| DeedError::Internal(e.to_string()))?;

    let result = state
        .deeds
        .push(doc! { "_id": id }, "surveyPlans", value)
        .await?;

    if result.matched_count == 0 {
        return Err(DeedError::NotFound("Deed not found".into()));
    }

    Ok(json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "message": "Survey plan added", "plan": plan }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetTokenRequest {
    deed_id: Option<String>,
    token_id: Option<i64>,
}

/// POST /api/deeds/set-token - bind the external token id, exactly once
pub async fn set_token(state: Arc<AppState>, body: Bytes) -> Result<Response<Full<Bytes>>> {
    let request: SetTokenRequest = parse_body(&body)?;
    let deed_id = request
        .deed_id
        .ok_or_else(|| DeedError::BadRequest("deedId is required".into()))?;
    let token_id = request
        .token_id
        .ok_or_else(|| DeedError::BadRequest("tokenId is required".into()))?;

    let id = parse_object_id(&deed_id)?;
    let deed = load_deed(&state, id).await?;

    if deed.token_id.is_some() {
        return Err(DeedError::BadRequest(
            "Deed already has a token id".into(),
        ));
    }

    state
        .deeds
        .update_one(doc! { "_id": id }, doc! { "$set": { "tokenId": token_id } })
        .await?;

    info!(deed_id = %id, token_id, "Token id bound to deed");

    let deed = load_deed(&state, id).await?;
    Ok(json_response(StatusCode::OK, &deed))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurveyNumberRequest {
    survey_plan_number: Option<String>,
}

/// PUT /api/deeds/update-survey-number/:id
pub async fn update_survey_number(
    state: Arc<AppState>,
    id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let request: SurveyNumberRequest = parse_body(&body)?;
    let number = request
        .survey_plan_number
        .ok_or_else(|| DeedError::BadRequest("surveyPlanNumber is required".into()))?;

    let id = parse_object_id(id)?;
    let result = state
        .deeds
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "surveyPlanNumber": number } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(DeedError::NotFound("Deed not found".into()));
    }

    let deed = load_deed(&state, id).await?;
    Ok(json_response(StatusCode::OK, &deed))
}

#[derive(Deserialize)]
struct TitleEntryRequest {
    from: Option<String>,
    to: Option<String>,
    amount: Option<f64>,
    share: Option<f64>,
}

/// POST /api/deeds/:deedId/transaction - append an immutable title record
pub async fn add_title_record(
    state: Arc<AppState>,
    id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let request: TitleEntryRequest = parse_body(&body)?;
    let (from, to) = match (request.from, request.to) {
        (Some(f), Some(t)) if !f.is_empty() && !t.is_empty() => (f, t),
        _ => return Err(DeedError::BadRequest("from and to are required".into())),
    };

    let record = TitleRecord {
        from,
        to,
        amount: request.amount.unwrap_or(0.0),
        share: request.share.unwrap_or(0.0),
        timestamp: chrono::Utc::now().timestamp(),
    };

    let id = parse_object_id(id)?;
    let value = bson::to_bson(&record).map_err(|e| DeedError::Internal(e.to_string()))?;
    let result = state.deeds.push(doc! { "_id": id }, "title", value).await?;

    if result.matched_count == 0 {
        return Err(DeedError::NotFound("Deed not found".into()));
    }

    Ok(json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "message": "Transaction added", "transaction": record }),
    ))
}

/// GET /api/deeds/surveyor/:addr and friends - deeds by assigned role wallet
pub async fn deeds_by_role_wallet(
    state: Arc<AppState>,
    field: &str,
    address: &str,
) -> Result<Response<Full<Bytes>>> {
    let deeds = state.deeds.find_many(doc! { field: address }).await?;
    Ok(json_response(StatusCode::OK, &deeds))
}

/// GET /api/deeds/owner/:addr - deeds owned by a wallet
pub async fn deeds_by_owner(
    state: Arc<AppState>,
    address: &str,
) -> Result<Response<Full<Bytes>>> {
    let deeds = state
        .deeds
        .find_many(doc! { "owners.address": address })
        .await?;
    Ok(json_response(StatusCode::OK, &deeds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_strips_identity_and_token_fields() {
        let mut update = doc! {
            "_id": ObjectId::new(),
            "deedNumber": "D-2",
            "metadata": { "createdAt": 0 },
            "tokenId": 99_i64,
            "district": "Colombo",
        };

        strip_immutable_fields(&mut update);

        assert_eq!(update.len(), 1);
        assert_eq!(update.get_str("district").unwrap(), "Colombo");
    }

    #[test]
    fn test_update_with_only_immutable_fields_is_empty() {
        let mut update = doc! { "tokenId": 7_i64, "deedNumber": "D-3" };
        strip_immutable_fields(&mut update);
        assert!(update.is_empty());
    }
}
