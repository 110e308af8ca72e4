//! Direct messaging endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use dairylink_auth::JwtValidator;
use dairylink_control::{Coordinator, Message, MessageId, ProfileId, SendMessageRequest};

use crate::auth::CurrentViewer;
use crate::error::ApiError;
use crate::handlers::{parse_id, ApiJson};
use crate::state::GatewayState;

/// A conversation, oldest message first.
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    /// The other participant.
    pub with: ProfileId,
    /// Messages in both directions.
    pub messages: Vec<Message>,
}

/// How many messages a mark-read call changed.
#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    /// Messages newly marked read.
    pub marked: u32,
}

/// Send a message.
///
/// # Errors
///
/// Returns 400 for empty or oversized content, 404 for an unknown receiver.
pub async fn send_message<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let message = state.coordinator.send_message(&viewer, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark one received message read.
///
/// # Errors
///
/// Returns 403 if the caller is not the receiver.
pub async fn mark_message_read<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let message_id: MessageId = parse_id(&message_id, "message")?;
    let message = state
        .coordinator
        .mark_message_read(&viewer, &message_id)
        .await?;

    Ok(Json(message))
}

/// The conversation between the caller and another profile.
///
/// # Errors
///
/// Returns 400 for a malformed profile ID.
pub async fn conversation<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(profile_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let other: ProfileId = parse_id(&profile_id, "profile")?;
    let messages = state.coordinator.conversation(&viewer, &other).await?;

    Ok(Json(ConversationResponse {
        with: other,
        messages,
    }))
}

/// Mark everything the other profile sent the caller as read.
///
/// # Errors
///
/// Returns 400 for a malformed profile ID.
pub async fn mark_conversation_read<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(profile_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let other: ProfileId = parse_id(&profile_id, "profile")?;
    let marked = state
        .coordinator
        .mark_conversation_read(&viewer, &other)
        .await?;

    Ok(Json(MarkedResponse { marked }))
}
