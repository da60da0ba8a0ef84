//! Shared types for the deed service

mod error;

pub use error::{DeedError, Result};
