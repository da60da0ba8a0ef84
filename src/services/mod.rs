//! Services layer
//!
//! Clients for external collaborators the deed service talks to.

pub mod transactions;

pub use transactions::{TransactionClient, TransactionRecord};
