use crate::{
    auth::AuthUser,
    entities::inventory_summary,
    errors::ServiceError,
    services::reports::{
        CustomerReport, ItemReport, ManualReportRequest, NegativeInventoryReport, ProductReport,
        ReportView, WarehouseReport, REPORT_VIEWS,
    },
    services::sessions::ActionKind,
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(customer_report))
        .route("/items/{item_name}", get(item_report))
        .route("/products/{product_name}", get(product_report))
        .route("/warehouses/{warehouse}", get(warehouse_report))
        .route("/negative-inventory", get(negative_inventory_report))
        .route("/inventory", get(all_inventory_report))
        .route("/manual/views", get(manual_report_views))
        .route("/manual", post(manual_report))
}

pub async fn customer_report(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<CustomerReport>>, ServiceError> {
    let report = state.services.reports.customer_report().await?;
    state
        .services
        .sessions
        .try_record_action(user.session.as_ref(), ActionKind::RunCustomerReport, json!({}))
        .await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn item_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_name): Path<String>,
) -> Result<Json<ApiResponse<ItemReport>>, ServiceError> {
    let report = state.services.reports.item_report(&item_name).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::RunItemReport,
            json!({ "item_name": item_name }),
        )
        .await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn product_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_name): Path<String>,
) -> Result<Json<ApiResponse<ProductReport>>, ServiceError> {
    let report = state.services.reports.product_report(&product_name).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::RunProductReport,
            json!({ "product_name": product_name }),
        )
        .await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn warehouse_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(warehouse): Path<String>,
) -> Result<Json<ApiResponse<WarehouseReport>>, ServiceError> {
    let report = state.services.reports.warehouse_report(&warehouse).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::RunWarehouseReport,
            json!({ "warehouse": warehouse }),
        )
        .await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn negative_inventory_report(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<NegativeInventoryReport>>, ServiceError> {
    let report = state.services.reports.negative_inventory_report().await?;
    state
        .services
        .sessions
        .try_record_action(user.session.as_ref(), ActionKind::RunNegativeReport, json!({}))
        .await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn all_inventory_report(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<inventory_summary::Model>>>, ServiceError> {
    let report = state.services.reports.all_inventory_report().await?;
    state
        .services
        .sessions
        .try_record_action(user.session.as_ref(), ActionKind::ViewReports, json!({}))
        .await;
    Ok(Json(ApiResponse::success(report)))
}

/// The views and columns the manual report builder may touch.
pub async fn manual_report_views() -> Json<ApiResponse<Vec<ReportView>>> {
    Json(ApiResponse::success(REPORT_VIEWS.to_vec()))
}

/// Runs a constrained ad-hoc query. View, columns and filter columns are
/// whitelist-checked; values are bound parameters; results cap at 1000.
#[utoipa::path(
    post,
    path = "/api/v1/reports/manual",
    request_body = ManualReportRequest,
    responses(
        (status = 200, description = "Rows returned"),
        (status = 400, description = "Invalid view or column selection", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn manual_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ManualReportRequest>,
) -> Result<Json<ApiResponse<Vec<JsonValue>>>, ServiceError> {
    let view = request.view.clone();
    let rows = state.services.reports.manual_report(request).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::RunManualReport,
            json!({ "view": view, "rows": rows.len() }),
        )
        .await;
    Ok(Json(ApiResponse::success(rows)))
}
