//! Ethereum-style signature recovery
//!
//! Recovers the signer's address from a personal-message signature. Pure
//! function, no I/O: given the canonical message and a 65-byte r||s||v
//! signature, the recovered address either matches the role-holder or the
//! signature is rejected.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::types::{DeedError, Result};

/// Prefix applied by wallets when signing free-form messages
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak digest of the prefixed personal message
pub fn personal_message_digest(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Recover the signer address from a message and a hex signature.
///
/// The signature is the 65-byte r||s||v layout produced by wallet
/// `personal_sign`, with v either 0/1 or 27/28. The returned address is
/// 0x-prefixed lowercase hex.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<String> {
    let sig_bytes = hex::decode(signature_hex.trim_start_matches("0x"))
        .map_err(|e| DeedError::InvalidSignature(format!("not valid hex: {}", e)))?;

    if sig_bytes.len() != 65 {
        return Err(DeedError::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            sig_bytes.len()
        )));
    }

    let v = sig_bytes[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::try_from(recovery_byte)
        .map_err(|e| DeedError::InvalidSignature(format!("invalid recovery id: {}", e)))?;

    let sig = Signature::from_slice(&sig_bytes[..64])
        .map_err(|e| DeedError::InvalidSignature(format!("invalid signature: {}", e)))?;

    let digest = personal_message_digest(message);

    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|e| DeedError::InvalidSignature(format!("recovery failed: {}", e)))?;

    Ok(address_from_key(&verifying_key))
}

/// Derive the address from a public key: last 20 bytes of the keccak hash
/// of the uncompressed point (without the 0x04 prefix byte)
pub fn address_from_key(key: &VerifyingKey) -> String {
    let encoded = key.to_encoded_point(false);
    let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}
