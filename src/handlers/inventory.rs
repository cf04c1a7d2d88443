use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::InventoryStatus,
    services::inventory::{InventorySnapshot, OnHandFilters, OnHandRow},
    services::sessions::ActionKind,
    ApiResponse, AppState,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses", get(list_warehouses))
        .route("/on-hand", get(on_hand))
        .route("/snapshot", get(snapshot))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WarehouseQuery {
    /// Case-insensitive substring filter on the common name.
    pub search: Option<String>,
}

/// Warehouse names for pickers.
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(query): Query<WarehouseQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    let warehouses = state
        .services
        .inventory
        .list_warehouses(query.search.as_deref())
        .await?
        .into_iter()
        .map(|w| w.common_name)
        .collect();
    Ok(Json(ApiResponse::success(warehouses)))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct OnHandQuery {
    pub status: Option<InventoryStatus>,
    pub search: Option<String>,
}

/// Current positions per (item, warehouse, status), folded from the full
/// transaction history.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/on-hand",
    params(OnHandQuery),
    responses(
        (status = 200, description = "Positions returned"),
        (status = 400, description = "Failed to fetch inventory", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn on_hand(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OnHandQuery>,
) -> Result<Json<ApiResponse<Vec<OnHandRow>>>, ServiceError> {
    let rows = state
        .services
        .inventory
        .on_hand(OnHandFilters {
            status: query.status,
            search: query.search,
        })
        .await?;

    state
        .services
        .sessions
        .try_record_action(user.session.as_ref(), ActionKind::ViewInventory, json!({}))
        .await;

    Ok(Json(ApiResponse::success(rows)))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SnapshotQuery {
    pub warehouse: String,
    /// Inventory as of 23:59:59 of this date.
    pub as_of: NaiveDate,
}

/// Latest on-hand breakdown per item from the snapshot view.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/snapshot",
    params(SnapshotQuery),
    responses(
        (status = 200, description = "Snapshot returned", body = InventorySnapshot),
        (status = 400, description = "Failed to fetch inventory", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<ApiResponse<InventorySnapshot>>, ServiceError> {
    let snapshot = state
        .services
        .inventory
        .snapshot(&query.warehouse, query.as_of)
        .await?;
    Ok(Json(ApiResponse::success(snapshot)))
}
