//! Roster endpoints.
//!
//! Only agents reach these successfully; farmers get 403 from the
//! coordinator's role check.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use dairylink_auth::JwtValidator;
use dairylink_control::{AddFarmerRequest, Coordinator, FarmerWithUnread, Profile, ProfileId};

use crate::auth::CurrentViewer;
use crate::error::ApiError;
use crate::handlers::{parse_id, ApiJson};
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for the roster.
#[derive(Debug, Serialize)]
pub struct RosterResponse {
    /// Farmers ordered by name, with unread counts.
    pub farmers: Vec<FarmerWithUnread>,
}

/// Response for farmer profiles not yet on a roster.
#[derive(Debug, Serialize)]
pub struct AvailableFarmersResponse {
    /// Farmer profiles ordered by name.
    pub profiles: Vec<Profile>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the caller's roster.
///
/// # Errors
///
/// Returns 403 for farmers.
pub async fn list_roster<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let farmers = state.coordinator.list_roster(&viewer).await?;
    Ok(Json(RosterResponse { farmers }))
}

/// Add a farmer to the caller's roster.
///
/// # Errors
///
/// Returns 409 if the farmer is already on a roster.
pub async fn add_farmer<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ApiJson(body): ApiJson<AddFarmerRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let farmer = state.coordinator.add_farmer(&viewer, body).await?;
    Ok((StatusCode::CREATED, Json(farmer)))
}

/// Farmer profiles no agent has added yet.
///
/// # Errors
///
/// Returns 403 for farmers.
pub async fn list_available<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let profiles = state.coordinator.available_farmer_profiles(&viewer).await?;
    Ok(Json(AvailableFarmersResponse { profiles }))
}

/// Remove a farmer from the caller's roster.
///
/// # Errors
///
/// Returns 404 if the farmer is not on a roster, 403 if it is on another
/// agent's.
pub async fn remove_farmer<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(farmer_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let farmer_id: ProfileId = parse_id(&farmer_id, "farmer")?;
    state.coordinator.remove_farmer(&viewer, &farmer_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Collection statistics for a farmer on the caller's roster.
///
/// # Errors
///
/// Returns 403 if the farmer is on another agent's roster.
pub async fn farmer_stats<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(farmer_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let farmer_id: ProfileId = parse_id(&farmer_id, "farmer")?;
    let stats = state
        .coordinator
        .roster_farmer_stats(&viewer, &farmer_id)
        .await?;

    Ok(Json(stats))
}
