//! WebSocket streams.
//!
//! Three push channels, all server-to-client JSON text frames:
//!
//! - `/v1/changes/ws` forwards change notifications concerning the caller.
//! - `/v1/live/stats/ws` pushes a farmer's statistics whenever they change.
//! - `/v1/live/roster/ws` pushes an agent's roster with unread counts.
//!
//! Client frames are ignored apart from close. The server pings at the
//! configured interval and closes a stream that has sent nothing, not even
//! a pong, within the idle timeout.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::time::Instant;

use dairylink_auth::JwtValidator;
use dairylink_control::{
    watch_roster, watch_stats, ChangeFilter, Coordinator, LiveView, ProfileId, Subscription,
};

use crate::auth::CurrentViewer;
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Ping cadence and idle cutoff for one stream.
#[derive(Debug, Clone, Copy)]
struct Keepalive {
    ping: Duration,
    idle: Duration,
}

impl Keepalive {
    fn from_config(config: &GatewayConfig) -> Self {
        Self {
            ping: config.websocket_ping(),
            idle: config.websocket_idle(),
        }
    }
}

/// Stream change notifications concerning the caller.
///
/// # Errors
///
/// Returns 401/404 before the upgrade if the caller cannot be resolved.
pub async fn changes_handler<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let profile_id = viewer.profile_id();
    let subscription = state
        .coordinator
        .subscribe(ChangeFilter::all().concerning(profile_id));
    let keepalive = Keepalive::from_config(&state.config);

    tracing::info!(profile_id = %profile_id, "Change stream opened");

    Ok(ws.on_upgrade(move |socket| stream_changes(socket, subscription, keepalive, profile_id)))
}

/// Stream the calling farmer's statistics.
///
/// # Errors
///
/// Returns 403 for agents.
pub async fn live_stats_handler<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    viewer.require_farmer()?;
    let profile_id = viewer.profile_id();
    let view = watch_stats(Arc::clone(&state.coordinator), viewer);
    let keepalive = Keepalive::from_config(&state.config);

    tracing::info!(profile_id = %profile_id, "Live stats stream opened");

    Ok(ws.on_upgrade(move |socket| stream_view(socket, view, keepalive, profile_id)))
}

/// Stream the calling agent's roster.
///
/// # Errors
///
/// Returns 403 for farmers.
pub async fn live_roster_handler<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    viewer.require_agent()?;
    let profile_id = viewer.profile_id();
    let view = watch_roster(Arc::clone(&state.coordinator), viewer);
    let keepalive = Keepalive::from_config(&state.config);

    tracing::info!(profile_id = %profile_id, "Live roster stream opened");

    Ok(ws.on_upgrade(move |socket| stream_view(socket, view, keepalive, profile_id)))
}

/// Forward notifications until either side goes away.
async fn stream_changes(
    socket: WebSocket,
    mut subscription: Subscription,
    keepalive: Keepalive,
    profile_id: ProfileId,
) {
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = tokio::time::interval(keepalive.ping);
    heartbeat.tick().await;
    let idle = tokio::time::sleep(keepalive.idle);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            notification = subscription.recv() => {
                let Some(notification) = notification else { break };
                if send_json(&mut sink, &notification).await.is_err() {
                    break;
                }
            }
            msg = stream.next() => {
                if is_closed(msg) {
                    break;
                }
                idle.as_mut().reset(Instant::now() + keepalive.idle);
            }
            () = &mut idle => {
                tracing::debug!(profile_id = %profile_id, "Closing idle stream");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(profile_id = %profile_id, "Change stream closed");
}

/// Push every snapshot the view produces until either side goes away.
///
/// The view is dropped on return, which stops its refresh task.
async fn stream_view<T>(
    socket: WebSocket,
    mut view: LiveView<T>,
    keepalive: Keepalive,
    profile_id: ProfileId,
) where
    T: Serialize + Clone + Send + Sync + 'static,
{
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = tokio::time::interval(keepalive.ping);
    heartbeat.tick().await;
    let idle = tokio::time::sleep(keepalive.idle);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            snapshot = view.changed() => {
                let Some(snapshot) = snapshot else { break };
                if send_json(&mut sink, &snapshot).await.is_err() {
                    break;
                }
            }
            msg = stream.next() => {
                if is_closed(msg) {
                    break;
                }
                idle.as_mut().reset(Instant::now() + keepalive.idle);
            }
            () = &mut idle => {
                tracing::debug!(profile_id = %profile_id, "Closing idle stream");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(profile_id = %profile_id, "Live stream closed");
}

fn is_closed(msg: Option<Result<Message, axum::Error>>) -> bool {
    matches!(msg, None | Some(Err(_) | Ok(Message::Close(_))))
}

async fn send_json<T: Serialize>(
    sink: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    match serde_json::to_string(value) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize stream frame");
            Ok(())
        }
    }
}
