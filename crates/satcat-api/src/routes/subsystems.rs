//! Subsystem API routes.
//!
//! ## Routes
//!
//! - `POST   /subsystems` - Create a subsystem
//! - `GET    /subsystems` - List subsystems by name
//! - `DELETE /subsystems/{id}` - Delete a subsystem and clear component references

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use satcat_core::SubsystemId;

use crate::context::RequestId;
use crate::error::{ApiError, ApiResult};
use crate::routes::components::SubsystemResponse;
use crate::server::AppState;

/// Request to create a subsystem.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubsystemRequest {
    /// Subsystem name (unique, at most 200 characters).
    pub name: String,
}

/// Creates subsystem routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subsystems", post(create_subsystem).get(list_subsystems))
        .route("/subsystems/:id", delete(delete_subsystem))
}

/// Create a subsystem.
#[utoipa::path(
    post,
    path = "/subsystems",
    tag = "subsystems",
    request_body = CreateSubsystemRequest,
    responses(
        (status = 201, description = "Subsystem created", body = SubsystemResponse),
        (status = 400, description = "Invalid name", body = ApiErrorBody),
        (status = 409, description = "Name already taken", body = ApiErrorBody),
    )
)]
pub(crate) async fn create_subsystem(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSubsystemRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(request_id = %request_id, name = %req.name, "Creating subsystem");
    let subsystem = state
        .catalog
        .create_subsystem(req.name)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok((StatusCode::CREATED, Json(SubsystemResponse::from(subsystem))))
}

/// List subsystems ordered by name.
#[utoipa::path(
    get,
    path = "/subsystems",
    tag = "subsystems",
    responses(
        (status = 200, description = "Subsystems listed", body = [SubsystemResponse]),
    )
)]
pub(crate) async fn list_subsystems(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let subsystems = state
        .catalog
        .list_subsystems()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(
        subsystems
            .into_iter()
            .map(SubsystemResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Delete a subsystem. Components that referenced it keep existing with no subsystem.
#[utoipa::path(
    delete,
    path = "/subsystems/{id}",
    tag = "subsystems",
    params(("id" = i64, Path, description = "Subsystem ID")),
    responses(
        (status = 204, description = "Subsystem deleted"),
        (status = 404, description = "Subsystem not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn delete_subsystem(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: SubsystemId = super::parse_id(&id, &request_id)?;
    tracing::info!(request_id = %request_id, subsystem_id = %id, "Deleting subsystem");
    state
        .catalog
        .delete_subsystem(id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(StatusCode::NO_CONTENT)
}
