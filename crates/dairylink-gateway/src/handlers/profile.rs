//! Profile and dashboard endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use dairylink_auth::JwtValidator;
use dairylink_control::{Coordinator, SyncProfileRequest};

use crate::auth::{AuthUser, CurrentViewer};
use crate::error::ApiError;
use crate::handlers::ApiJson;
use crate::state::GatewayState;

/// The caller's resolved profile, tagged with its role.
///
/// # Errors
///
/// Returns 404 if the caller has not synced a profile.
pub async fn get_me<C, V>(
    State(_state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    Ok(Json(viewer))
}

/// Create or update the caller's profile.
///
/// # Errors
///
/// Returns 409 if the body names a different role than the stored profile.
pub async fn sync_me<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<SyncProfileRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let profile = state
        .coordinator
        .sync_profile(&user.profile_id, body)
        .await?;

    Ok(Json(profile))
}

/// Role-specific dashboard.
///
/// # Errors
///
/// Returns an error if the coordination operation fails.
pub async fn dashboard<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let dashboard = state.coordinator.dashboard(&viewer).await?;
    Ok(Json(dashboard))
}
