//! Collection endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use dairylink_auth::JwtValidator;
use dairylink_control::{
    AgentCollections, CollectionId, Coordinator, FarmerCollections, RecordCollectionRequest,
    ScheduleCollectionRequest, Viewer,
};

use crate::auth::CurrentViewer;
use crate::error::ApiError;
use crate::handlers::{parse_id, ApiJson};
use crate::state::GatewayState;

/// Collections as seen by the caller's role.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CollectionsResponse {
    /// Agent view, grouped by status with farmer names.
    Agent(AgentCollections),
    /// Farmer history.
    Farmer(FarmerCollections),
}

/// List collections. Agents get their schedule, farmers their history.
///
/// # Errors
///
/// Returns an error if the coordination operation fails.
pub async fn list_collections<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let response = match &viewer {
        Viewer::Agent(_) => {
            CollectionsResponse::Agent(state.coordinator.agent_collections(&viewer).await?)
        }
        Viewer::Farmer(_) => {
            CollectionsResponse::Farmer(state.coordinator.farmer_collections(&viewer).await?)
        }
    };

    Ok(Json(response))
}

/// Schedule a collection.
///
/// # Errors
///
/// Returns 400 for a slot in the past, 403 for farmers or foreign rosters.
pub async fn schedule_collection<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    ApiJson(body): ApiJson<ScheduleCollectionRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let collection = state.coordinator.schedule_collection(&viewer, body).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// Record the actual quantity collected.
///
/// # Errors
///
/// Returns 409 if the collection is not scheduled.
pub async fn record_collection<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(collection_id): Path<String>,
    ApiJson(body): ApiJson<RecordCollectionRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let collection_id: CollectionId = parse_id(&collection_id, "collection")?;
    let collection = state
        .coordinator
        .record_collection(&viewer, &collection_id, body)
        .await?;

    Ok(Json(collection))
}

/// Cancel a scheduled collection.
///
/// # Errors
///
/// Returns 409 if the collection is not scheduled.
pub async fn cancel_collection<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(collection_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let collection_id: CollectionId = parse_id(&collection_id, "collection")?;
    let collection = state
        .coordinator
        .cancel_collection(&viewer, &collection_id)
        .await?;

    Ok(Json(collection))
}

/// The calling farmer's statistics.
///
/// # Errors
///
/// Returns 403 for agents.
pub async fn my_stats<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<impl IntoResponse, ApiError>
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    let stats = state.coordinator.my_stats(&viewer).await?;
    Ok(Json(stats))
}
