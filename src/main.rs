//! Deed service - land deed registry microservice

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deed_service::{
    auth::JwtValidator,
    config::Args,
    db::schemas::{DeedDoc, QrGrantDoc, DEED_COLLECTION, QR_GRANT_COLLECTION},
    db::MongoClient,
    nats::{DeedEvent, NatsClient, Producer},
    server,
    services::TransactionClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("deed_service={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Deed Service - Land Deed Registry");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("NATS: {}", args.nats.nats_url);
    info!("Transaction service: {}", args.transaction_service_url);
    info!("======================================");

    // MongoDB is the system of record; refuse to start without it
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let deeds = mongo.collection::<DeedDoc>(DEED_COLLECTION).await?;
    let qr_grants = mongo.collection::<QrGrantDoc>(QR_GRANT_COLLECTION).await?;

    // Connect to NATS (optional in dev mode)
    let nats = match NatsClient::new(&args.nats, &format!("deed-service-{}", args.node_id)).await {
        Ok(client) => {
            info!("NATS connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("NATS connection failed (dev mode, continuing without): {}", e);
                None
            } else {
                error!("NATS connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let producer = nats.map(|client| Arc::new(Producer::new(client, &args.nats)));

    // Announce startup; delivery failure is logged, never fatal
    if let Some(ref producer) = producer {
        let event = DeedEvent::ServiceStarted {
            service: "deed-service",
            node_id: args.node_id.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = producer.publish(&event).await {
            warn!("Startup event not delivered: {}", e);
        }
    }

    let jwt = if args.dev_mode && args.jwt_secret.is_none() {
        warn!("No JWT secret configured - using built-in dev secret");
        JwtValidator::new_dev()
    } else {
        let secret = args.effective_jwt_secret().map_err(anyhow::Error::msg)?;
        JwtValidator::new(secret, 3600)?
    };

    let transactions = Arc::new(TransactionClient::new(
        &args.transaction_service_url,
        args.request_timeout_ms,
    ));

    let state = Arc::new(server::AppState {
        args,
        deeds,
        qr_grants,
        jwt,
        producer,
        transactions,
    });

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
