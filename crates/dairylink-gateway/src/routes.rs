//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Uri};
use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use dairylink_auth::JwtValidator;
use dairylink_control::Coordinator;

use crate::handlers::{announcements, collections, farmers, health, messages, profile, ws};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Profile (authenticated)
/// - `GET /v1/me` - Resolved viewer
/// - `PUT /v1/me` - Sync own profile
/// - `GET /v1/dashboard` - Role-specific dashboard
///
/// ## Roster (agents)
/// - `GET /v1/farmers` - Roster with unread counts
/// - `POST /v1/farmers` - Add farmer
/// - `GET /v1/farmers/available` - Farmer profiles not on any roster
/// - `DELETE /v1/farmers/:farmer_id` - Remove farmer
/// - `GET /v1/farmers/:farmer_id/stats` - Farmer statistics
///
/// ## Collections
/// - `GET /v1/collections` - Agent schedule or farmer history
/// - `POST /v1/collections` - Schedule collection
/// - `POST /v1/collections/:collection_id/record` - Record quantity
/// - `POST /v1/collections/:collection_id/cancel` - Cancel
/// - `GET /v1/stats` - Farmer's own statistics
///
/// ## Messages
/// - `POST /v1/messages` - Send
/// - `POST /v1/messages/:message_id/read` - Mark one read
/// - `GET /v1/conversations/:profile_id` - Conversation
/// - `POST /v1/conversations/:profile_id/read` - Mark conversation read
///
/// ## Announcements
/// - `GET /v1/announcements` - Active announcements
/// - `POST /v1/announcements` - Post announcement
/// - `POST /v1/announcements/:announcement_id/read` - Mark read
///
/// ## Streams (WebSocket)
/// - `GET /v1/changes/ws` - Change notifications
/// - `GET /v1/live/stats/ws` - Live farmer statistics
/// - `GET /v1/live/roster/ws` - Live agent roster
pub fn create_router<C, V>(state: GatewayState<C, V>) -> Router
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Profile
        .route(
            "/v1/me",
            get(profile::get_me::<C, V>).put(profile::sync_me::<C, V>),
        )
        .route("/v1/dashboard", get(profile::dashboard::<C, V>))
        // Roster
        .route(
            "/v1/farmers",
            get(farmers::list_roster::<C, V>).post(farmers::add_farmer::<C, V>),
        )
        .route(
            "/v1/farmers/available",
            get(farmers::list_available::<C, V>),
        )
        .route(
            "/v1/farmers/:farmer_id",
            delete(farmers::remove_farmer::<C, V>),
        )
        .route(
            "/v1/farmers/:farmer_id/stats",
            get(farmers::farmer_stats::<C, V>),
        )
        // Collections
        .route(
            "/v1/collections",
            get(collections::list_collections::<C, V>)
                .post(collections::schedule_collection::<C, V>),
        )
        .route(
            "/v1/collections/:collection_id/record",
            post(collections::record_collection::<C, V>),
        )
        .route(
            "/v1/collections/:collection_id/cancel",
            post(collections::cancel_collection::<C, V>),
        )
        .route("/v1/stats", get(collections::my_stats::<C, V>))
        // Messages
        .route("/v1/messages", post(messages::send_message::<C, V>))
        .route(
            "/v1/messages/:message_id/read",
            post(messages::mark_message_read::<C, V>),
        )
        .route(
            "/v1/conversations/:profile_id",
            get(messages::conversation::<C, V>),
        )
        .route(
            "/v1/conversations/:profile_id/read",
            post(messages::mark_conversation_read::<C, V>),
        )
        // Announcements
        .route(
            "/v1/announcements",
            get(announcements::list_announcements::<C, V>)
                .post(announcements::create_announcement::<C, V>),
        )
        .route(
            "/v1/announcements/:announcement_id/read",
            post(announcements::mark_announcement_read::<C, V>),
        )
        // Streams
        .route("/v1/changes/ws", get(ws::changes_handler::<C, V>))
        .route("/v1/live/stats/ws", get(ws::live_stats_handler::<C, V>))
        .route("/v1/live/roster/ws", get(ws::live_roster_handler::<C, V>))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(cors)
                .layer(MapResponseBodyLayer::new(Body::new))
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Request span that keeps bearer tokens passed as `access_token` out of the logs.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %redacted_uri(request.uri()),
        version = ?request.version(),
    )
}

fn redacted_uri(uri: &Uri) -> String {
    let path = uri.path();
    let Some(query) = uri.query() else {
        return path.to_string();
    };
    let query: Vec<&str> = query
        .split('&')
        .map(|pair| {
            if pair.starts_with("access_token=") {
                "access_token=[redacted]"
            } else {
                pair
            }
        })
        .collect();
    format!("{path}?{}", query.join("&"))
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_is_redacted() {
        let uri: Uri = "/v1/live/stats/ws?access_token=test-token:abc&since=5"
            .parse()
            .unwrap();
        let logged = redacted_uri(&uri);
        assert_eq!(logged, "/v1/live/stats/ws?access_token=[redacted]&since=5");
        assert!(!logged.contains("test-token"));

        let plain: Uri = "/v1/me".parse().unwrap();
        assert_eq!(redacted_uri(&plain), "/v1/me");
    }

    #[test]
    fn cors_any_origin() {
        let origins = vec!["*".to_string()];
        let _layer = build_cors_layer(&origins);
    }

    #[test]
    fn cors_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "not a header\nvalue".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }
}
