//! JWT token handling for caller authentication
//!
//! The auth service issues HS256 tokens; this service only verifies them and
//! attaches the caller's wallet address and role to the request.
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - In production, JWT_SECRET must be a strong random value from environment

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::DeedError;

/// Platform role carried in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Surveyor,
    Notary,
    Ivsl,
    Registrar,
    Admin,
}

impl Role {
    /// Elevated roles bypass deed-ownership checks on grant management
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Registrar)
    }
}

/// Payload stored in a JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller's wallet address
    pub wallet_address: String,
    /// User identifier (email/username)
    pub identifier: String,
    /// Platform role
    #[serde(default)]
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    /// Lowercased wallet address for case-insensitive comparisons
    pub fn wallet_lowercase(&self) -> String {
        self.wallet_address.to_lowercase()
    }
}

/// JWT validator (and generator, used by tests and dev tooling)
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, DeedError> {
        if secret.is_empty() {
            return Err(DeedError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(DeedError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a validator for dev mode (allows weak secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: 3600,
        }
    }

    /// Generate a token for a wallet address and role
    pub fn generate_token(
        &self,
        wallet_address: &str,
        identifier: &str,
        role: Role,
    ) -> Result<String, DeedError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DeedError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            wallet_address: wallet_address.to_string(),
            identifier: identifier.to_string(),
            role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| DeedError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, DeedError> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidToken => "Invalid token",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Token validation failed",
            };
            DeedError::Unauthorized(msg.into())
        })
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    // Also support raw token (for flexibility)
    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let validator = test_validator();
        let token = validator
            .generate_token("0xAbC123", "alice@example.com", Role::Registrar)
            .unwrap();
        let claims = validator.verify_token(&token).unwrap();
        assert_eq!(claims.wallet_address, "0xAbC123");
        assert_eq!(claims.wallet_lowercase(), "0xabc123");
        assert_eq!(claims.role, Role::Registrar);
        assert!(claims.role.is_elevated());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let validator = test_validator();
        let token = validator
            .generate_token("0xabc", "bob", Role::User)
            .unwrap();

        let other = JwtValidator::new(
            "different-secret-that-is-32-characters!!".into(),
            3600,
        )
        .unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(
            extract_token_from_header(Some("abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }

    #[test]
    fn test_user_role_not_elevated() {
        assert!(!Role::User.is_elevated());
        assert!(!Role::Surveyor.is_elevated());
        assert!(Role::Admin.is_elevated());
    }
}
