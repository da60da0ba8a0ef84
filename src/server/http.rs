//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! plain match over the method and the path split into segments after the
//! `/api/deeds` prefix.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{extract_token_from_header, Claims, JwtValidator};
use crate::config::Args;
use crate::db::mongo::MongoCollection;
use crate::db::schemas::{DeedDoc, QrGrantDoc};
use crate::nats::Producer;
use crate::routes::{self, error_response, parse_query_params};
use crate::services::TransactionClient;
use crate::types::{DeedError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub deeds: MongoCollection<DeedDoc>,
    pub qr_grants: MongoCollection<QrGrantDoc>,
    pub jwt: JwtValidator,
    /// Lifecycle event producer; None when NATS is unavailable in dev mode
    pub producer: Option<Arc<Producer>>,
    pub transactions: Arc<TransactionClient>,
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Deed service listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - weak JWT secret allowed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        )
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        )
        .body(Full::new(Bytes::new()))
        .unwrap_or_default()
}

fn not_found() -> Response<Full<Bytes>> {
    error_response(DeedError::NotFound("Route not found".into()))
}

/// Verify the caller's JWT from the Authorization header
fn authenticate(state: &AppState, req: &Request<Incoming>) -> Result<Claims> {
    let header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let token = extract_token_from_header(header)
        .ok_or_else(|| DeedError::Unauthorized("Missing Authorization header".into()))?;

    state.jwt.verify_token(token)
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = parse_query_params(req.uri().query().unwrap_or(""));

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(preflight_response());
    }

    if method == Method::GET && (path == "/health" || path == "/healthz") {
        return Ok(routes::health_check(state));
    }

    // Everything else lives under the deed API prefix
    let Some(rest) = path.strip_prefix("/api/deeds") else {
        return Ok(not_found());
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    // Authenticate up front; public routes ignore the result
    let auth = authenticate(&state, &req);

    let body = req.into_body().collect().await?.to_bytes();

    let response = route(state, method, &segments, &query, auth, body).await;
    Ok(response.unwrap_or_else(error_response))
}

async fn route(
    state: Arc<AppState>,
    method: Method,
    segments: &[&str],
    query: &HashMap<String, String>,
    auth: Result<Claims>,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    match (method, segments) {
        // Collection routes
        (Method::GET, []) => {
            auth?;
            routes::deeds::list_deeds(state).await
        }
        (Method::POST, []) => {
            auth?;
            routes::deeds::create_deed(state, body).await
        }

        // Tokenization callbacks from the chain service, unauthenticated
        (Method::POST, ["set-token"]) => routes::deeds::set_token(state, body).await,
        (Method::PUT, ["update-survey-number", id]) => {
            routes::deeds::update_survey_number(state, id, body).await
        }
        (Method::PUT, ["update-owner", token_id]) => {
            routes::deeds::update_owner(state, token_id, body).await
        }
        (Method::PUT, ["update-full-owner", token_id]) => {
            routes::deeds::update_full_owner(state, token_id, body).await
        }

        // Lookup by business key, gated to owners and elevated roles
        (Method::GET, ["deed", deed_number]) => {
            let claims = auth?;
            routes::deeds::get_deed_by_number(state, &claims, deed_number).await
        }

        // Role worklists
        (Method::GET, ["surveyor", address]) => {
            auth?;
            routes::deeds::deeds_by_role_wallet(state, "surveyAssigned", address).await
        }
        (Method::GET, ["notary", address]) => {
            auth?;
            routes::deeds::deeds_by_role_wallet(state, "notaryAssigned", address).await
        }
        (Method::GET, ["ivsl", address]) => {
            auth?;
            routes::deeds::deeds_by_role_wallet(state, "ivslAssigned", address).await
        }
        (Method::GET, ["owner", address]) => {
            auth?;
            routes::deeds::deeds_by_owner(state, address).await
        }

        // Valuation updates by the assigned valuer
        (Method::POST, ["ivsl", id]) => {
            auth?;
            routes::deeds::update_valuation(state, id, body).await
        }

        // QR grant routes
        (Method::POST, ["qr", "generate"]) => {
            let claims = auth?;
            routes::qr::generate_qr(state, &claims, body).await
        }
        (Method::GET, ["qr", "my"]) => {
            let claims = auth?;
            routes::qr::my_qrcodes(state, &claims).await
        }
        (Method::GET, ["qr", qr_id, "permissions"]) => {
            routes::qr::check_qr_permissions(state, qr_id, query).await
        }
        (Method::PUT, ["qr", qr_id, "permissions"]) => {
            let claims = auth?;
            routes::qr::update_qr_permissions(state, &claims, qr_id, body).await
        }
        (Method::GET, ["qr", qr_id, "deed"]) => {
            routes::qr::get_qr_deed(state, qr_id, query).await
        }
        (Method::DELETE, ["qr", qr_id]) => {
            let claims = auth?;
            routes::qr::delete_qr(state, &claims, qr_id).await
        }
        (Method::GET, [deed_id, "qrcodes"]) => {
            let claims = auth?;
            routes::qr::qrcodes_by_deed(state, &claims, deed_id).await
        }

        // Per-deed sub-resources
        (Method::POST, [deed_id, "transaction"]) => {
            routes::deeds::add_title_record(state, deed_id, body).await
        }
        (Method::POST, [deed_id, "sign", role]) => {
            auth?;
            routes::deeds::sign_deed(state, deed_id, role, body).await
        }
        (Method::POST, [deed_id, "plan"]) => {
            auth?;
            routes::deeds::insert_plan(state, deed_id, body).await
        }

        // Single-document CRUD, kept last so named routes match first
        (Method::GET, [id]) => {
            auth?;
            routes::deeds::get_deed(state, id).await
        }
        (Method::PUT, [id]) => {
            auth?;
            routes::deeds::update_deed(state, id, body).await
        }
        (Method::DELETE, [id]) => {
            auth?;
            routes::deeds::delete_deed(state, id).await
        }

        _ => Ok(not_found()),
    }
}
