//! Database schemas for the deed service
//!
//! Defines MongoDB document structures for deeds and QR access grants.

mod deed;
mod metadata;
mod qr_grant;

pub use deed::{
    DeedCategory, DeedDoc, DeedTypeInfo, LandSizeUnit, LandType, LocationPoint, Owner, Sides,
    SurveyPlan, TitleRecord, ValuationRecord, DEED_COLLECTION,
};
pub use metadata::Metadata;
pub use qr_grant::{PermissionType, QrGrantDoc, QR_GRANT_COLLECTION};
