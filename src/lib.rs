//! Deed service - land deed registry microservice
//!
//! Stores land deed records in MongoDB and exposes an HTTP API for deed
//! CRUD, multi-role e-signatures (surveyor, notary, valuer), valuation
//! ledger updates, ownership transfers and QR access grants.
//!
//! ## Services
//!
//! - **Deeds**: CRUD, tokenization callbacks and role worklists
//! - **Signing**: Ethereum-style signature recovery per assigned role
//! - **Valuation**: append-only request/estimate ledger
//! - **QR grants**: permission-scoped release of encrypted deed payloads
//! - **Events**: lifecycle notifications over NATS, fire-and-forget

pub mod auth;
pub mod config;
pub mod db;
pub mod deed;
pub mod nats;
pub mod routes;
pub mod server;
pub mod services;
pub mod signing;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{DeedError, Result};
