//! Valuation ledger updates
//!
//! The valuation history is append-only with a mutable last entry: an owner
//! requests a value, the valuation board later fills the estimate into the
//! outstanding entry. Three modes cover request, estimate and the combined
//! estimate-of-last-request update.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::schemas::{DeedDoc, ValuationRecord};
use crate::types::{DeedError, Result};

/// How a valuation update is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationMode {
    /// Append a new entry carrying the requested value
    Request,
    /// Fill the outstanding request in place, or append a bare estimate
    Estimate,
    /// Overwrite the last entry's estimate unconditionally
    EstimateRequested,
}

impl FromStr for ValuationMode {
    type Err = DeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "request" => Ok(Self::Request),
            "estimate" => Ok(Self::Estimate),
            "estimate-requested" => Ok(Self::EstimateRequested),
            other => Err(DeedError::BadRequest(format!(
                "Invalid valuation mode '{}', expected request, estimate or estimate-requested",
                other
            ))),
        }
    }
}

/// Caller-supplied valuation values.
///
/// Absent and null are treated identically: both normalize to None and are
/// stored as null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationUpdate {
    #[serde(default)]
    pub requested_value: Option<f64>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub is_accepted: Option<bool>,
}

/// Apply one valuation update to a loaded deed.
///
/// Mutates the deed in memory and returns a copy of the affected entry; the
/// caller persists the deed with a single save.
pub fn apply_valuation(
    deed: &mut DeedDoc,
    mode: ValuationMode,
    update: &ValuationUpdate,
    now: i64,
) -> Result<ValuationRecord> {
    match mode {
        ValuationMode::Request => {
            let entry = ValuationRecord {
                requested_value: update.requested_value,
                estimated_value: None,
                is_accepted: None,
                timestamp: now,
            };
            deed.valuation.push(entry.clone());
            Ok(entry)
        }

        ValuationMode::Estimate => {
            // Fill the outstanding request in place if one exists
            if let Some(last) = deed.valuation.last_mut() {
                if last.estimated_value.is_none() {
                    last.estimated_value = update.estimated_value;
                    if update.is_accepted.is_some() {
                        last.is_accepted = update.is_accepted;
                    }
                    return Ok(last.clone());
                }
            }

            // No outstanding request: append a bare estimate
            let entry = ValuationRecord {
                requested_value: None,
                estimated_value: update.estimated_value,
                is_accepted: update.is_accepted,
                timestamp: now,
            };
            deed.valuation.push(entry.clone());
            Ok(entry)
        }

        ValuationMode::EstimateRequested => {
            let last = deed.valuation.last_mut().ok_or_else(|| {
                DeedError::BadRequest("No prior valuation to estimate against".into())
            })?;

            last.estimated_value = update.estimated_value;
            last.is_accepted = update.is_accepted;
            last.timestamp = now;
            Ok(last.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_710_000_000;

    fn update(
        requested: Option<f64>,
        estimated: Option<f64>,
        accepted: Option<bool>,
    ) -> ValuationUpdate {
        ValuationUpdate {
            requested_value: requested,
            estimated_value: estimated,
            is_accepted: accepted,
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "request".parse::<ValuationMode>().unwrap(),
            ValuationMode::Request
        );
        assert_eq!(
            "estimate-requested".parse::<ValuationMode>().unwrap(),
            ValuationMode::EstimateRequested
        );
        assert!(matches!(
            "appraise".parse::<ValuationMode>(),
            Err(DeedError::BadRequest(_))
        ));
    }

    #[test]
    fn test_request_then_estimate_fills_in_place() {
        let mut deed = DeedDoc::sample();

        apply_valuation(
            &mut deed,
            ValuationMode::Request,
            &update(Some(100.0), None, None),
            NOW,
        )
        .unwrap();

        let entry = apply_valuation(
            &mut deed,
            ValuationMode::Estimate,
            &update(None, Some(150.0), None),
            NOW + 10,
        )
        .unwrap();

        assert_eq!(deed.valuation.len(), 1);
        assert_eq!(entry.requested_value, Some(100.0));
        assert_eq!(entry.estimated_value, Some(150.0));
        assert_eq!(entry.is_accepted, None);
        // In-place fill keeps the request timestamp
        assert_eq!(deed.valuation[0].timestamp, NOW);
    }

    #[test]
    fn test_estimate_appends_when_last_already_estimated() {
        let mut deed = DeedDoc::sample();
        deed.valuation.push(ValuationRecord {
            requested_value: Some(100.0),
            estimated_value: Some(90.0),
            is_accepted: Some(true),
            timestamp: NOW,
        });

        let entry = apply_valuation(
            &mut deed,
            ValuationMode::Estimate,
            &update(None, Some(120.0), None),
            NOW + 10,
        )
        .unwrap();

        assert_eq!(deed.valuation.len(), 2);
        assert_eq!(entry.requested_value, None);
        assert_eq!(entry.estimated_value, Some(120.0));
        // Earlier entry is frozen
        assert_eq!(deed.valuation[0].estimated_value, Some(90.0));
    }

    #[test]
    fn test_estimate_on_empty_history_appends() {
        let mut deed = DeedDoc::sample();

        apply_valuation(
            &mut deed,
            ValuationMode::Estimate,
            &update(None, Some(75.0), Some(false)),
            NOW,
        )
        .unwrap();

        assert_eq!(deed.valuation.len(), 1);
        assert_eq!(deed.valuation[0].requested_value, None);
        assert_eq!(deed.valuation[0].estimated_value, Some(75.0));
        assert_eq!(deed.valuation[0].is_accepted, Some(false));
    }

    #[test]
    fn test_estimate_requested_fails_only_on_empty_history() {
        let mut deed = DeedDoc::sample();

        assert!(matches!(
            apply_valuation(
                &mut deed,
                ValuationMode::EstimateRequested,
                &update(None, Some(450.0), Some(true)),
                NOW,
            ),
            Err(DeedError::BadRequest(_))
        ));

        apply_valuation(
            &mut deed,
            ValuationMode::Request,
            &update(Some(500.0), None, None),
            NOW,
        )
        .unwrap();

        let entry = apply_valuation(
            &mut deed,
            ValuationMode::EstimateRequested,
            &update(None, Some(450.0), Some(true)),
            NOW + 20,
        )
        .unwrap();

        assert_eq!(deed.valuation.len(), 1);
        assert_eq!(entry.requested_value, Some(500.0));
        assert_eq!(entry.estimated_value, Some(450.0));
        assert_eq!(entry.is_accepted, Some(true));
        assert_eq!(entry.timestamp, NOW + 20);
    }

    #[test]
    fn test_estimate_requested_overwrites_unconditionally() {
        let mut deed = DeedDoc::sample();
        deed.valuation.push(ValuationRecord {
            requested_value: Some(500.0),
            estimated_value: Some(450.0),
            is_accepted: Some(true),
            timestamp: NOW,
        });

        let entry = apply_valuation(
            &mut deed,
            ValuationMode::EstimateRequested,
            &update(None, None, None),
            NOW + 5,
        )
        .unwrap();

        // Null inputs overwrite to null
        assert_eq!(entry.estimated_value, None);
        assert_eq!(entry.is_accepted, None);
        assert_eq!(entry.requested_value, Some(500.0));
    }

    #[test]
    fn test_null_and_absent_normalize_identically() {
        let parsed: ValuationUpdate =
            serde_json::from_str(r#"{"requestedValue": null}"#).unwrap();
        let absent: ValuationUpdate = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(parsed.requested_value, absent.requested_value);
        assert_eq!(parsed.estimated_value, absent.estimated_value);
    }
}
