//! Authentication and authorization for the deed service
//!
//! Provides:
//! - JWT token validation (tokens are issued by the user service)
//! - Caller roles used for field-level authorization

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, Role};
