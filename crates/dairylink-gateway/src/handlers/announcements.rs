//! Announcement endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use dairylink_auth::JwtValidator;
use dairylink_control::{AnnouncementId, AnnouncementView, Coordinator, CreateAnnouncementRequest};

use crate::auth::CurrentViewer;
use crate::error::ApiError;
use crate::handlers::{parse_id, ApiJson};
use crate::state::GatewayState;

/// Active announcements, newest first.
#[derive(Debug, Serialize)]
pub struct AnnouncementsResponse {
    /// Announcements with the caller's read state.
    pub announcements: Vec<AnnouncementView>,
}

/// List active announcements.
///
/// # Errors
///
/// Returns an error if the coordination operation fails.
pub async fn list_announcements<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let announcements = state.coordinator.list_announcements(&viewer).await?;
    Ok(Json(AnnouncementsResponse { announcements }))
}

/// Post an announcement.
///
/// # Errors
///
/// Returns 403 for farmers, 400 for an empty title or a past expiry.
pub async fn create_announcement<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ApiJson(body): ApiJson<CreateAnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let announcement = state.coordinator.create_announcement(&viewer, body).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

/// Mark an announcement read for the caller.
///
/// # Errors
///
/// Returns 404 for an unknown announcement.
pub async fn mark_announcement_read<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(announcement_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let announcement_id: AnnouncementId = parse_id(&announcement_id, "announcement")?;
    let recipient = state
        .coordinator
        .mark_announcement_read(&viewer, &announcement_id)
        .await?;

    Ok(Json(recipient))
}
