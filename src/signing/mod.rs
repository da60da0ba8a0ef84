//! Multi-party deed signing
//!
//! Each deed carries three role slots (surveyor, notary, valuation board),
//! every slot an assigned wallet address plus a signature field that stays
//! empty until the assigned holder signs. A signature attests to the deed's
//! token id, not its content, so content edits after tokenization do not
//! invalidate prior signatures.
//!
//! State machine per slot: Unsigned -> Signed. There is no revocation path;
//! re-signing with a valid signature overwrites with the same outcome.

pub mod recover;

pub use recover::{personal_message_digest, recover_signer};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::schemas::DeedDoc;
use crate::types::{DeedError, Result};

/// The three signing roles on a deed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerRole {
    /// Licensed surveyor
    Survey,
    /// Notary public
    Notary,
    /// Government valuation board (IVSL)
    Ivsl,
}

impl SignerRole {
    /// Wallet address assigned to this role on the deed, if any
    pub fn assigned_address<'a>(&self, deed: &'a DeedDoc) -> Option<&'a str> {
        match self {
            Self::Survey => deed.survey_assigned.as_deref(),
            Self::Notary => deed.notary_assigned.as_deref(),
            Self::Ivsl => deed.ivsl_assigned.as_deref(),
        }
    }

    /// Signature currently stored for this role, if any
    pub fn signature<'a>(&self, deed: &'a DeedDoc) -> Option<&'a str> {
        match self {
            Self::Survey => deed.survey_signature.as_deref(),
            Self::Notary => deed.notary_signature.as_deref(),
            Self::Ivsl => deed.ivsl_signature.as_deref(),
        }
    }

    /// Store a signature into this role's slot
    pub fn set_signature(&self, deed: &mut DeedDoc, signature: String) {
        match self {
            Self::Survey => deed.survey_signature = Some(signature),
            Self::Notary => deed.notary_signature = Some(signature),
            Self::Ivsl => deed.ivsl_signature = Some(signature),
        }
    }
}

impl FromStr for SignerRole {
    type Err = DeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "survey" => Ok(Self::Survey),
            "notary" => Ok(Self::Notary),
            "ivsl" => Ok(Self::Ivsl),
            other => Err(DeedError::BadRequest(format!(
                "Invalid signing role '{}', expected survey, notary or ivsl",
                other
            ))),
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Survey => write!(f, "survey"),
            Self::Notary => write!(f, "notary"),
            Self::Ivsl => write!(f, "ivsl"),
        }
    }
}

/// Attach a role signature to a loaded deed.
///
/// Verifies that the signature was produced by the wallet assigned to the
/// role, over the deed's token id. Mutates the deed in memory; the caller
/// persists it. Fails with:
/// - `BadRequest` when the deed has no token id or no wallet is assigned to
///   the role
/// - `InvalidSignature` when the signature cannot be parsed or recovered
/// - `Unauthorized` when the recovered signer is not the assigned wallet
pub fn apply_signature(deed: &mut DeedDoc, role: SignerRole, signature_hex: &str) -> Result<()> {
    let token_id = deed.token_id.ok_or_else(|| {
        DeedError::BadRequest("Deed has no token id; tokenize before signing".into())
    })?;

    let assigned = role
        .assigned_address(deed)
        .ok_or_else(|| {
            DeedError::BadRequest(format!("No wallet assigned to the {} role", role))
        })?
        .to_lowercase();

    // Signatures attest the token-identified deed
    let message = token_id.to_string();
    let recovered = recover_signer(&message, signature_hex)?;

    if recovered != assigned {
        return Err(DeedError::Unauthorized(format!(
            "Signature does not belong to the assigned {} wallet",
            role
        )));
    }

    role.set_signature(deed, signature_hex.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signer() -> (SigningKey, String) {
        let key = SigningKey::from_slice(&[0x07u8; 32]).unwrap();
        let address = recover::address_from_key(key.verifying_key());
        (key, address)
    }

    fn sign_token(key: &SigningKey, token_id: i64) -> String {
        let digest = personal_message_digest(&token_id.to_string());
        let (sig, recid) = key.sign_prehash_recoverable(&digest).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recid.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("survey".parse::<SignerRole>().unwrap(), SignerRole::Survey);
        assert_eq!("notary".parse::<SignerRole>().unwrap(), SignerRole::Notary);
        assert_eq!("ivsl".parse::<SignerRole>().unwrap(), SignerRole::Ivsl);
        assert!(matches!(
            "valuer".parse::<SignerRole>(),
            Err(DeedError::BadRequest(_))
        ));
    }

    #[test]
    fn test_assigned_signer_succeeds() {
        let (key, address) = signer();
        let mut deed = DeedDoc::sample();
        deed.token_id = Some(42);
        // Assignment stored with mixed case; comparison is case-insensitive
        deed.survey_assigned = Some(address.to_uppercase().replace("0X", "0x"));

        let sig = sign_token(&key, 42);
        apply_signature(&mut deed, SignerRole::Survey, &sig).unwrap();
        assert_eq!(deed.survey_signature.as_deref(), Some(sig.as_str()));
        assert!(deed.notary_signature.is_none());
    }

    #[test]
    fn test_unassigned_wallet_rejected() {
        let (key, _) = signer();
        let mut deed = DeedDoc::sample();
        deed.token_id = Some(42);
        deed.notary_assigned = Some("0x1111111111111111111111111111111111111111".into());

        let sig = sign_token(&key, 42);
        assert!(matches!(
            apply_signature(&mut deed, SignerRole::Notary, &sig),
            Err(DeedError::Unauthorized(_))
        ));
        assert!(deed.notary_signature.is_none());
    }

    #[test]
    fn test_missing_assignment_rejected() {
        let (key, _) = signer();
        let mut deed = DeedDoc::sample();
        deed.token_id = Some(42);

        let sig = sign_token(&key, 42);
        assert!(matches!(
            apply_signature(&mut deed, SignerRole::Ivsl, &sig),
            Err(DeedError::BadRequest(_))
        ));
    }

    #[test]
    fn test_untokenized_deed_rejected() {
        let (key, address) = signer();
        let mut deed = DeedDoc::sample();
        deed.survey_assigned = Some(address);

        let sig = sign_token(&key, 42);
        assert!(matches!(
            apply_signature(&mut deed, SignerRole::Survey, &sig),
            Err(DeedError::BadRequest(_))
        ));
    }

    #[test]
    fn test_signature_over_wrong_token_rejected() {
        let (key, address) = signer();
        let mut deed = DeedDoc::sample();
        deed.token_id = Some(42);
        deed.survey_assigned = Some(address);

        let sig = sign_token(&key, 43);
        assert!(apply_signature(&mut deed, SignerRole::Survey, &sig).is_err());
    }

    #[test]
    fn test_resign_overwrites_idempotently() {
        let (key, address) = signer();
        let mut deed = DeedDoc::sample();
        deed.token_id = Some(42);
        deed.ivsl_assigned = Some(address);

        let sig = sign_token(&key, 42);
        apply_signature(&mut deed, SignerRole::Ivsl, &sig).unwrap();
        apply_signature(&mut deed, SignerRole::Ivsl, &sig).unwrap();
        assert_eq!(deed.ivsl_signature.as_deref(), Some(sig.as_str()));
    }
}
