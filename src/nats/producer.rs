//! Notification producer
//!
//! Best-effort publisher of service lifecycle and deed-transaction events.
//! At-least-once with bounded retry: connection-level faults are the expected
//! failure mode, so each attempt flushes and backs off exponentially before
//! retrying. Callers on the HTTP path use [`Producer::publish_detached`] so a
//! slow or dead queue never blocks or fails the primary response.

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NatsArgs;
use crate::nats::NatsClient;
use crate::types::{DeedError, Result};

/// Events published to the queue
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeedEvent {
    /// Service came up and connected to its collaborators
    ServiceStarted {
        service: &'static str,
        node_id: String,
        timestamp: i64,
    },
    /// A deed document was created
    DeedCreated {
        deed_id: String,
        deed_number: String,
        timestamp: i64,
    },
    /// A full ownership transfer completed
    OwnershipTransferred {
        deed_id: String,
        from: String,
        to: String,
        timestamp: i64,
    },
}

/// Retrying publisher bound to one subject
pub struct Producer {
    client: NatsClient,
    subject: String,
    retry_count: u32,
    backoff_base: Duration,
}

impl Producer {
    pub fn new(client: NatsClient, args: &NatsArgs) -> Self {
        Self {
            client,
            subject: args.nats_subject.clone(),
            retry_count: args.publish_retry_count,
            backoff_base: Duration::from_millis(args.publish_backoff_ms),
        }
    }

    /// Publish an event, retrying with exponential backoff.
    ///
    /// Returns the last error once all attempts are exhausted.
    pub async fn publish(&self, event: &DeedEvent) -> Result<()> {
        let payload = Bytes::from(serde_json::to_vec(event)?);

        let mut last_err = DeedError::Nats("no publish attempts made".into());
        for attempt in 1..=self.retry_count {
            let result = async {
                self.client.publish(&self.subject, payload.clone()).await?;
                self.client.flush().await
            }
            .await;

            match result {
                Ok(()) => {
                    debug!(subject = %self.subject, attempt, "Event published");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        subject = %self.subject,
                        attempt,
                        max_attempts = self.retry_count,
                        error = %e,
                        "Publish attempt failed"
                    );
                    last_err = e;
                }
            }

            if attempt < self.retry_count {
                tokio::time::sleep(self.backoff_base * 2u32.pow(attempt - 1)).await;
            }
        }

        Err(last_err)
    }

    /// Publish from the HTTP path: spawn a detached task and log failures.
    ///
    /// The response is never gated on the queue; the deed mutation is the
    /// durable outcome and the notification is advisory.
    pub fn publish_detached(self: &Arc<Self>, event: DeedEvent) {
        let producer = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = producer.publish(&event).await {
                warn!(error = %e, "Dropping event after exhausting publish retries");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = DeedEvent::DeedCreated {
            deed_id: "65f0".into(),
            deed_number: "D-1".into(),
            timestamp: 1_710_000_000,
        };
        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&event).unwrap()).unwrap();
        assert_eq!(json["event"], "deed_created");
        assert_eq!(json["deed_number"], "D-1");
        assert_eq!(json["timestamp"], 1_710_000_000);
    }

    // Publish/retry behavior requires a running NATS server; covered by
    // integration environment, not unit tests
}
