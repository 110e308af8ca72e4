//! HTTP and WebSocket gateway for dairylink.
//!
//! This crate provides the public-facing API that farmer and agent clients
//! talk to. It handles:
//!
//! - Bearer token validation and profile resolution
//! - REST endpoints for profiles, the roster, collections, messages and
//!   announcements
//! - WebSocket streams of change notifications and live views
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Farmer / Agent clients                      │
//! │                   (HTTP / WebSocket)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    dairylink-gateway                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  AuthUser / │ │   Router    │ │  Change + LiveView  │    │
//! │  │  Viewer     │ │  + Handlers │ │  streams            │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    ┌─────────┴─────────┐
//!                    ▼                   ▼
//!             ┌─────────────┐     ┌──────────┐
//!             │ Coordinator │     │   Auth   │
//!             │  (+ Store)  │     │  (JWT)   │
//!             └─────────────┘     └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dairylink_gateway::{GatewayConfig, GatewayState, create_router};
//! use dairylink_control::CoordinatorService;
//! use dairylink_auth::{AuthConfig, SecretValidator};
//! use dairylink_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/dairylink")?);
//! let coordinator = Arc::new(CoordinatorService::with_defaults(store));
//! let auth_config = AuthConfig {
//!     jwt_secret: "change-me".to_string(),
//!     ..AuthConfig::default()
//! };
//! let jwt_validator = Arc::new(SecretValidator::new(&auth_config));
//!
//! let state = GatewayState::new(coordinator, jwt_validator, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;

// Re-export key types for convenience
pub use auth::{AuthUser, CurrentViewer};
