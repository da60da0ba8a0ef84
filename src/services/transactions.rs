//! Transaction service client
//!
//! Records deed lifecycle movements with the external transaction service.
//! Calls are advisory: the deed document is the source of truth and a failed
//! or slow transaction record never fails the primary operation. Handlers
//! spawn these calls detached from the response path.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{DeedError, Result};

/// Payload posted to the transaction service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub deed_id: String,
    pub from: String,
    pub to: String,
    pub hash: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
}

impl TransactionRecord {
    /// Record for a freshly created deed
    pub fn deed_created(deed_id: &str, owner: &str, hash: Option<String>, amount: f64) -> Self {
        Self {
            deed_id: deed_id.to_string(),
            from: "system".to_string(),
            to: owner.to_string(),
            hash: hash.unwrap_or_else(default_hash),
            amount,
            kind: "init",
            description: format!("Deed with ID {} has been created.", deed_id),
        }
    }

    /// Record for a full ownership transfer
    pub fn full_transfer(
        deed_id: &str,
        from: &str,
        to: &str,
        hash: Option<String>,
        amount: f64,
    ) -> Self {
        Self {
            deed_id: deed_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            hash: hash.unwrap_or_else(default_hash),
            amount,
            kind: "full_transfer",
            description: format!("Full deed transfer from {} to {}.", from, to),
        }
    }
}

fn default_hash() -> String {
    format!("hash_{}", chrono::Utc::now().timestamp_millis())
}

/// HTTP client for the transaction service
#[derive(Clone)]
pub struct TransactionClient {
    http: reqwest::Client,
    base_url: String,
}

impl TransactionClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Post a transaction record
    pub async fn record(&self, record: &TransactionRecord) -> Result<()> {
        let response = self
            .http
            .post(&self.base_url)
            .json(record)
            .send()
            .await
            .map_err(|e| DeedError::Internal(format!("Transaction service unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(DeedError::Internal(format!(
                "Transaction service returned {}",
                response.status()
            )));
        }

        debug!(deed_id = %record.deed_id, kind = record.kind, "Transaction recorded");
        Ok(())
    }

    /// Post from the HTTP path: spawn detached and log failures
    pub fn record_detached(self: &Arc<Self>, record: TransactionRecord) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = client.record(&record).await {
                warn!(
                    deed_id = %record.deed_id,
                    kind = record.kind,
                    error = %e,
                    "Failed to record transaction (non-fatal)"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deed_created_record_shape() {
        let record = TransactionRecord::deed_created("65f0", "0xabc", None, 0.0);
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(json["deedId"], "65f0");
        assert_eq!(json["from"], "system");
        assert_eq!(json["to"], "0xabc");
        assert_eq!(json["type"], "init");
        assert!(json["hash"].as_str().unwrap().starts_with("hash_"));
    }

    #[test]
    fn test_full_transfer_keeps_supplied_hash() {
        let record =
            TransactionRecord::full_transfer("65f0", "0xaaa", "0xbbb", Some("0xh1".into()), 5.0);
        assert_eq!(record.hash, "0xh1");
        assert_eq!(record.kind, "full_transfer");
        assert_eq!(record.amount, 5.0);
    }

    #[test]
    fn test_record_surfaces_unreachable_service_as_internal() {
        // Port 9 (discard) is closed; connect is refused well inside the timeout
        let client = TransactionClient::new("http://127.0.0.1:9/api/transactions", 500);
        let record = TransactionRecord::deed_created("65f0", "0xabc", None, 0.0);

        let result = tokio_test::block_on(client.record(&record));
        assert!(matches!(result, Err(DeedError::Internal(_))));
    }
}
