//! Health check endpoint
//!
//! Liveness probe: returns 200 whenever the service is running. MongoDB is a
//! hard startup dependency, so a running process implies a connected store at
//! boot; NATS may be absent in dev mode and is reported as degraded.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::json_response;
use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub mode: String,
    pub node_id: String,
    pub queue_connected: bool,
    pub timestamp: String,
}

/// Liveness probe handler
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let queue_connected = state.producer.is_some();

    let response = HealthResponse {
        healthy: true,
        status: if queue_connected { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
        queue_connected,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    json_response(StatusCode::OK, &response)
}
