//! Deed domain logic
//!
//! Pure state transitions over loaded documents: valuation ledger updates,
//! ownership transfer and QR access evaluation. Route handlers load, apply
//! and persist; nothing in this module performs I/O.

pub mod access;
pub mod ownership;
pub mod valuation;

pub use access::{
    check_access, ensure_deed_owner_or_elevated, ensure_grant_owner_or_elevated,
    normalize_allowed_addresses, AccessDecision,
};
pub use ownership::{apply_transfer, OwnerTransfer};
pub use valuation::{apply_valuation, ValuationMode, ValuationUpdate};
