//! Component API routes.
//!
//! ## Routes
//!
//! - `POST   /components` - Create a component
//! - `GET    /components` - List components (`?roots_only=true` for roots)
//! - `GET    /components/tree` - Every root with its descendants
//! - `POST   /components/seed` - Insert the demo hierarchy when empty
//! - `GET    /components/export/excel` - Download the catalog as XLSX
//! - `GET    /components/{id}` - Get one component
//! - `PATCH  /components/{id}` - Partially update a component
//! - `DELETE /components/{id}` - Delete a component (children become roots)
//! - `GET    /components/{id}/tree` - Subtree rooted at a component

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use satcat_catalog::export;
use satcat_catalog::{
    ComponentPatch, ComponentTreeNode, ComponentView, MakeBuy, NewComponent, Subsystem,
};
use satcat_core::{ComponentId, SubsystemId};

use crate::context::RequestId;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Make/buy flag: `M` for built in-house, `B` for procured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MakeBuyCode {
    /// Built in-house.
    M,
    /// Procured.
    B,
}

impl From<MakeBuyCode> for MakeBuy {
    fn from(value: MakeBuyCode) -> Self {
        match value {
            MakeBuyCode::M => Self::Make,
            MakeBuyCode::B => Self::Buy,
        }
    }
}

impl From<MakeBuy> for MakeBuyCode {
    fn from(value: MakeBuy) -> Self {
        match value {
            MakeBuy::Make => Self::M,
            MakeBuy::Buy => Self::B,
        }
    }
}

/// Request to create a component.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateComponentRequest {
    /// Component name (unique across the catalog, at most 200 characters).
    pub name: String,
    /// Optional part number (at most 50 characters).
    #[serde(default)]
    pub part_number: Option<String>,
    /// Optional WBS code (at most 50 characters).
    #[serde(default)]
    pub wbs: Option<String>,
    /// Optional make/buy flag.
    #[serde(default)]
    pub make_buy: Option<MakeBuyCode>,
    /// Unit mass in kilograms (default 0).
    #[serde(default)]
    pub mass_kg: f64,
    /// Unit cost in US dollars (default 0).
    #[serde(default)]
    pub cost_usd: f64,
    /// Number of units (default 1).
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Optional parent component ID.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Optional subsystem ID.
    #[serde(default)]
    pub subsystem_id: Option<i64>,
}

fn default_quantity() -> i64 {
    1
}

impl From<CreateComponentRequest> for NewComponent {
    fn from(req: CreateComponentRequest) -> Self {
        Self {
            name: req.name,
            part_number: req.part_number,
            wbs: req.wbs,
            make_buy: req.make_buy.map(MakeBuy::from),
            mass_kg: req.mass_kg,
            cost_usd: req.cost_usd,
            quantity: req.quantity,
            parent_id: req.parent_id.map(ComponentId::new),
            subsystem_id: req.subsystem_id.map(SubsystemId::new),
        }
    }
}

/// Partial update. Absent fields are left unchanged; `null` clears a
/// nullable field and is rejected for `name`, `mass_kg`, `cost_usd` and
/// `quantity`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[allow(clippy::option_option)]
pub struct UpdateComponentRequest {
    /// New name.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    /// New part number, or `null` to clear.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub part_number: Option<Option<String>>,
    /// New WBS code, or `null` to clear.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub wbs: Option<Option<String>>,
    /// New make/buy flag, or `null` to clear.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<MakeBuyCode>)]
    pub make_buy: Option<Option<MakeBuyCode>>,
    /// New unit mass.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub mass_kg: Option<Option<f64>>,
    /// New unit cost.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub cost_usd: Option<Option<f64>>,
    /// New quantity.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub quantity: Option<Option<i64>>,
    /// New parent ID, or `null` to make the component a root.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub parent_id: Option<Option<i64>>,
    /// New subsystem ID, or `null` to clear.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub subsystem_id: Option<Option<i64>>,
}

/// Marks a field as present, keeping an explicit `null` as `Some(None)`.
#[allow(clippy::option_option)]
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateComponentRequest> for ComponentPatch {
    fn from(req: UpdateComponentRequest) -> Self {
        Self {
            name: req.name,
            part_number: req.part_number,
            wbs: req.wbs,
            make_buy: req.make_buy.map(|v| v.map(MakeBuy::from)),
            mass_kg: req.mass_kg,
            cost_usd: req.cost_usd,
            quantity: req.quantity,
            parent_id: req.parent_id.map(|v| v.map(ComponentId::new)),
            subsystem_id: req.subsystem_id.map(|v| v.map(SubsystemId::new)),
        }
    }
}

/// Query parameters for listing components.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListComponentsQuery {
    /// Only return components without a parent.
    #[serde(default)]
    pub roots_only: bool,
}

/// Subsystem reference embedded in component responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubsystemResponse {
    /// Subsystem ID.
    pub id: i64,
    /// Subsystem name.
    pub name: String,
}

impl From<Subsystem> for SubsystemResponse {
    fn from(subsystem: Subsystem) -> Self {
        Self {
            id: subsystem.id.get(),
            name: subsystem.name,
        }
    }
}

/// Component response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentResponse {
    /// Component ID.
    pub id: i64,
    /// Component name.
    pub name: String,
    /// Part number.
    pub part_number: Option<String>,
    /// WBS code.
    pub wbs: Option<String>,
    /// Make/buy flag.
    pub make_buy: Option<MakeBuyCode>,
    /// Unit mass in kilograms.
    pub mass_kg: f64,
    /// Unit cost in US dollars.
    pub cost_usd: f64,
    /// Number of units.
    pub quantity: i64,
    /// Parent component ID.
    pub parent_id: Option<i64>,
    /// Subsystem ID.
    pub subsystem_id: Option<i64>,
    /// Resolved subsystem.
    pub subsystem: Option<SubsystemResponse>,
}

impl From<ComponentView> for ComponentResponse {
    fn from(view: ComponentView) -> Self {
        let c = view.component;
        Self {
            id: c.id.get(),
            name: c.name,
            part_number: c.part_number,
            wbs: c.wbs,
            make_buy: c.make_buy.map(MakeBuyCode::from),
            mass_kg: c.mass_kg,
            cost_usd: c.cost_usd,
            quantity: c.quantity,
            parent_id: c.parent_id.map(ComponentId::get),
            subsystem_id: c.subsystem_id.map(SubsystemId::get),
            subsystem: view.subsystem.map(SubsystemResponse::from),
        }
    }
}

/// Nested component tree.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentTreeResponse {
    /// Component ID.
    pub id: i64,
    /// Component name.
    pub name: String,
    /// Part number.
    pub part_number: Option<String>,
    /// WBS code.
    pub wbs: Option<String>,
    /// Make/buy flag.
    pub make_buy: Option<MakeBuyCode>,
    /// Unit mass in kilograms.
    pub mass_kg: f64,
    /// Unit cost in US dollars.
    pub cost_usd: f64,
    /// Number of units.
    pub quantity: i64,
    /// Parent component ID.
    pub parent_id: Option<i64>,
    /// Subsystem ID.
    pub subsystem_id: Option<i64>,
    /// Children in ID order.
    pub children: Vec<ComponentTreeResponse>,
}

impl From<ComponentTreeNode> for ComponentTreeResponse {
    fn from(node: ComponentTreeNode) -> Self {
        Self {
            id: node.id.get(),
            name: node.name,
            part_number: node.part_number,
            wbs: node.wbs,
            make_buy: node.make_buy.map(MakeBuyCode::from),
            mass_kg: node.mass_kg,
            cost_usd: node.cost_usd,
            quantity: node.quantity,
            parent_id: node.parent_id.map(ComponentId::get),
            subsystem_id: node.subsystem_id.map(SubsystemId::get),
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

/// Creates component routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/components", post(create_component).get(list_components))
        .route("/components/tree", get(component_forest))
        .route("/components/seed", post(seed_components))
        .route("/components/export/excel", get(export_components))
        .route(
            "/components/:id",
            get(get_component)
                .patch(update_component)
                .delete(delete_component),
        )
        .route("/components/:id/tree", get(component_tree))
}

/// Create a component.
#[utoipa::path(
    post,
    path = "/components",
    tag = "components",
    request_body = CreateComponentRequest,
    responses(
        (status = 201, description = "Component created", body = ComponentResponse),
        (status = 400, description = "Invalid field", body = ApiErrorBody),
        (status = 404, description = "Parent or subsystem not found", body = ApiErrorBody),
        (status = 409, description = "Name already taken", body = ApiErrorBody),
    )
)]
pub(crate) async fn create_component(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateComponentRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(
        request_id = %request_id,
        name = %req.name,
        parent_id = ?req.parent_id,
        "Creating component"
    );
    let view = state
        .catalog
        .create_component(req.into())
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok((StatusCode::CREATED, Json(ComponentResponse::from(view))))
}

/// List components ordered by ID.
#[utoipa::path(
    get,
    path = "/components",
    tag = "components",
    params(ListComponentsQuery),
    responses(
        (status = 200, description = "Components listed", body = [ComponentResponse]),
    )
)]
pub(crate) async fn list_components(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListComponentsQuery>,
) -> ApiResult<impl IntoResponse> {
    tracing::debug!(request_id = %request_id, roots_only = query.roots_only, "Listing components");
    let views = state
        .catalog
        .list_components(query.roots_only)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(
        views
            .into_iter()
            .map(ComponentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Get a component by ID.
#[utoipa::path(
    get,
    path = "/components/{id}",
    tag = "components",
    params(("id" = i64, Path, description = "Component ID")),
    responses(
        (status = 200, description = "Component found", body = ComponentResponse),
        (status = 404, description = "Component not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_component(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ComponentId = super::parse_id(&id, &request_id)?;
    let view = state
        .catalog
        .get_component(id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(ComponentResponse::from(view)))
}

/// Partially update a component.
#[utoipa::path(
    patch,
    path = "/components/{id}",
    tag = "components",
    params(("id" = i64, Path, description = "Component ID")),
    request_body = UpdateComponentRequest,
    responses(
        (status = 200, description = "Component updated", body = ComponentResponse),
        (status = 400, description = "Invalid field, self-parent, or cycle", body = ApiErrorBody),
        (status = 404, description = "Component, parent, or subsystem not found", body = ApiErrorBody),
        (status = 409, description = "Name already taken", body = ApiErrorBody),
    )
)]
pub(crate) async fn update_component(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateComponentRequest>,
) -> ApiResult<impl IntoResponse> {
    let id: ComponentId = super::parse_id(&id, &request_id)?;
    tracing::info!(request_id = %request_id, component_id = %id, "Updating component");
    let view = state
        .catalog
        .update_component(id, req.into())
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(ComponentResponse::from(view)))
}

/// Delete a component. Its children become roots.
#[utoipa::path(
    delete,
    path = "/components/{id}",
    tag = "components",
    params(("id" = i64, Path, description = "Component ID")),
    responses(
        (status = 204, description = "Component deleted"),
        (status = 404, description = "Component not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn delete_component(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ComponentId = super::parse_id(&id, &request_id)?;
    tracing::info!(request_id = %request_id, component_id = %id, "Deleting component");
    state
        .catalog
        .delete_component(id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the subtree rooted at a component.
#[utoipa::path(
    get,
    path = "/components/{id}/tree",
    tag = "components",
    params(("id" = i64, Path, description = "Root component ID")),
    responses(
        (status = 200, description = "Subtree assembled", body = ComponentTreeResponse),
        (status = 404, description = "Component not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn component_tree(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ComponentId = super::parse_id(&id, &request_id)?;
    let tree = state
        .catalog
        .component_tree(id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(ComponentTreeResponse::from(tree)))
}

/// Get every root with its descendants.
#[utoipa::path(
    get,
    path = "/components/tree",
    tag = "components",
    responses(
        (status = 200, description = "Forest assembled", body = [ComponentTreeResponse]),
    )
)]
pub(crate) async fn component_forest(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let forest = state
        .catalog
        .component_forest()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(
        forest
            .into_iter()
            .map(ComponentTreeResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Insert the demo hierarchy when the catalog is empty.
///
/// Returns the whole catalog; calling it again changes nothing.
#[utoipa::path(
    post,
    path = "/components/seed",
    tag = "components",
    responses(
        (status = 200, description = "Catalog after seeding", body = [ComponentResponse]),
    )
)]
pub(crate) async fn seed_components(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(request_id = %request_id, "Seeding demo hierarchy");
    let views = state
        .catalog
        .seed()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok(Json(
        views
            .into_iter()
            .map(ComponentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Download the catalog as a spreadsheet.
#[utoipa::path(
    get,
    path = "/components/export/excel",
    tag = "components",
    responses(
        (status = 200, description = "XLSX workbook attachment named components.xlsx"),
    )
)]
pub(crate) async fn export_components(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .catalog
        .export_workbook()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_str()))?;
    Ok((
        [
            (header::CONTENT_TYPE, export::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::FILE_NAME),
            ),
        ],
        bytes,
    ))
}
