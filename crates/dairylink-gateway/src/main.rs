//! Dairylink Gateway - HTTP/WebSocket API
//!
//! Entry point for the gateway service. The coordination service and the
//! RocksDB store run embedded in this process.
//!
//! # Environment
//!
//! - `LISTEN_ADDR` (default `0.0.0.0:8080`)
//! - `DATA_DIR` (default `/data/dairylink`)
//! - `JWT_SECRET` (required unless built with `dev-mode`)
//! - `JWT_AUDIENCE` (default `authenticated`)
//! - `JWT_ISSUER` (optional)
//! - `CORS_ORIGINS` (comma-separated, default `*`)
//! - `RUST_LOG` (default `info,dairylink=debug`)
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock JWT validator.
//! Use tokens in format: `test-token:<profile-uuid>`

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use dairylink_auth::MockJwtValidator;
#[cfg(not(feature = "dev-mode"))]
use dairylink_auth::{AuthConfig, SecretValidator};
use dairylink_control::{CoordinatorService, ServiceConfig};
use dairylink_gateway::{create_router, GatewayConfig, GatewayState};
use dairylink_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dairylink=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dairylink Gateway");

    // Load configuration from environment
    let mut gateway_config = GatewayConfig::default();
    if let Ok(addr) = std::env::var("LISTEN_ADDR") {
        gateway_config.listen_addr = addr;
    }
    if let Ok(origins) = std::env::var("CORS_ORIGINS") {
        gateway_config.cors_origins = GatewayConfig::parse_origins(&origins);
    }
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/dairylink".into());

    tracing::info!(
        listen_addr = %gateway_config.listen_addr,
        data_dir = %data_dir,
        cors_origins = ?gateway_config.cors_origins,
        "Gateway configuration loaded"
    );

    // Initialize RocksDB store
    let service_config = ServiceConfig::default();
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open_with_capacity(
        &data_dir,
        service_config.change_feed_capacity,
    )?);

    let coordinator = Arc::new(CoordinatorService::new(store, service_config));
    tracing::info!("Coordinator initialized");

    // Initialize JWT validator
    #[cfg(feature = "dev-mode")]
    let jwt_validator = {
        tracing::warn!("DEV MODE ENABLED - using mock JWT validator");
        tracing::warn!("Use tokens in format: test-token:<profile-uuid>");
        Arc::new(MockJwtValidator)
    };

    #[cfg(not(feature = "dev-mode"))]
    let jwt_validator = {
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;
        let mut auth_config = AuthConfig {
            jwt_secret,
            issuer: std::env::var("JWT_ISSUER").ok(),
            ..AuthConfig::default()
        };
        if let Ok(audience) = std::env::var("JWT_AUDIENCE") {
            auth_config.audience = audience;
        }
        tracing::info!(
            audience = %auth_config.audience,
            issuer = ?auth_config.issuer,
            "JWT validator configured"
        );
        Arc::new(SecretValidator::new(&auth_config))
    };

    let listen_addr = gateway_config.listen_addr.clone();
    let state = GatewayState::new(coordinator, jwt_validator, gateway_config);
    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
