//! Configuration for the deed service
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Deed service - land deed registry microservice
#[derive(Parser, Debug, Clone)]
#[command(name = "deed-service")]
#[command(about = "Land deed registry with e-signatures, valuations and QR access grants")]
pub struct Args {
    /// Unique node identifier for this service instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5001")]
    pub listen: SocketAddr,

    /// Enable development mode (NATS optional, relaxed JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// NATS configuration
    #[command(flatten)]
    pub nats: NatsArgs,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "deedlink")]
    pub mongodb_db: String,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Base URL of the external transaction service
    #[arg(
        long,
        env = "TRANSACTION_SERVICE_URL",
        default_value = "http://localhost:5004/api/transactions"
    )]
    pub transaction_service_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in milliseconds for outbound HTTP calls
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,
}

/// NATS connection and publish-retry settings
#[derive(Parser, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,

    /// Subject lifecycle and deed events are published to
    #[arg(long, env = "NATS_SUBJECT", default_value = "deedlink.deeds.events")]
    pub nats_subject: String,

    /// Maximum publish attempts before giving up
    #[arg(long, env = "PUBLISH_RETRY_COUNT", default_value = "3")]
    pub publish_retry_count: u32,

    /// Base backoff between publish attempts in milliseconds (doubles per attempt)
    #[arg(long, env = "PUBLISH_BACKOFF_MS", default_value = "500")]
    pub publish_backoff_ms: u64,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn effective_jwt_secret(&self) -> Result<String, String> {
        if self.dev_mode {
            Ok(self
                .jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret-not-for-production".to_string()))
        } else {
            self.jwt_secret
                .clone()
                .ok_or_else(|| "JWT_SECRET is required in production mode".to_string())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(s) if s.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
        }

        if self.nats.publish_retry_count == 0 {
            return Err("PUBLISH_RETRY_COUNT must be at least 1".to_string());
        }

        if self.transaction_service_url.is_empty() {
            return Err("TRANSACTION_SERVICE_URL must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_allows_missing_jwt_secret() {
        let args = Args::parse_from(["deed-service", "--dev-mode"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let args = Args::parse_from(["deed-service"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let args = Args::parse_from(["deed-service", "--jwt-secret", "short"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_effective_jwt_secret_never_panics() {
        let dev = Args::parse_from(["deed-service", "--dev-mode"]);
        assert!(dev.effective_jwt_secret().unwrap().len() >= 32);

        let prod = Args::parse_from(["deed-service"]);
        assert!(prod.effective_jwt_secret().is_err());

        let configured = Args::parse_from([
            "deed-service",
            "--jwt-secret",
            "0123456789abcdef0123456789abcdef",
        ]);
        assert_eq!(
            configured.effective_jwt_secret().unwrap(),
            "0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn test_zero_retry_count_rejected() {
        let mut args = Args::parse_from(["deed-service", "--dev-mode"]);
        args.nats.publish_retry_count = 0;
        assert!(args.validate().is_err());
    }
}
