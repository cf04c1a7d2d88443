use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::InventoryStatus,
    services::counts::{CountLineUpdate, CountWorkflow, PendingTransactionLine, VarianceLine},
    services::sessions::ActionKind,
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(start))
        .route("/{id}", get(get_workflow).delete(discard))
        .route("/{id}/warehouse", post(select_warehouse))
        .route("/{id}/date", post(select_date))
        .route("/{id}/lines", put(update_line).post(add_item).delete(remove_line))
        .route("/{id}/variances", post(review_variances))
        .route("/{id}/adjustment", post(generate_adjustment))
        .route("/{id}/back", post(back))
}

/// Starts a new count workflow at the warehouse step.
pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    let workflow = state.services.counts.start();
    state
        .services
        .sessions
        .try_record_action(user.session.as_ref(), ActionKind::StartCount, json!({}))
        .await;
    Ok(Json(ApiResponse::success(workflow)))
}

pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    Ok(Json(ApiResponse::success(state.services.counts.get(id)?)))
}

pub async fn discard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.counts.discard(id)?;
    Ok(Json(ApiResponse::success(())))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectWarehouseRequest {
    pub warehouse: String,
}

pub async fn select_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectWarehouseRequest>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    let workflow = state
        .services
        .counts
        .select_warehouse(id, &request.warehouse)
        .await?;
    Ok(Json(ApiResponse::success(workflow)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectDateRequest {
    /// Inventory as of 23:59:59 of this date; must not be in the future.
    pub date: NaiveDate,
}

/// Picks the as-of date and pre-populates count lines from the snapshot.
pub async fn select_date(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectDateRequest>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    let workflow = state.services.counts.select_date(id, request.date).await?;
    Ok(Json(ApiResponse::success(workflow)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LineRequest {
    pub item_name: String,
    pub inventory_status: InventoryStatus,
    #[serde(flatten)]
    pub update: CountLineUpdate,
}

/// Records a physical quantity or case count for one line.
pub async fn update_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LineRequest>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    let workflow = state.services.counts.update_line(
        id,
        &request.item_name,
        request.inventory_status,
        request.update,
    )?;
    Ok(Json(ApiResponse::success(workflow)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub item_name: String,
    pub inventory_status: InventoryStatus,
}

/// Adds an item that was not in the snapshot.
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    let workflow = state
        .services
        .counts
        .add_item(id, &request.item_name, request.inventory_status)
        .await?;
    Ok(Json(ApiResponse::success(workflow)))
}

pub async fn remove_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    let workflow =
        state
            .services
            .counts
            .remove_line(id, &request.item_name, request.inventory_status)?;
    Ok(Json(ApiResponse::success(workflow)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VarianceReview {
    /// Nonzero variances only; zero-variance lines stay in the workflow.
    pub variances: Vec<VarianceLine>,
    pub pending: Vec<PendingTransactionLine>,
}

/// Computes variances and surfaces still-pending lines for review.
#[utoipa::path(
    post,
    path = "/api/v1/counts/{id}/variances",
    params(("id" = Uuid, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Variances computed", body = VarianceReview),
        (status = 400, description = "No count lines", body = crate::errors::ErrorResponse),
        (status = 404, description = "Workflow not found", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn review_variances(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VarianceReview>>, ServiceError> {
    let workflow = state.services.counts.review_variances(id).await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::CompleteCount,
            json!({ "warehouse": workflow.warehouse, "date": workflow.count_date }),
        )
        .await;

    Ok(Json(ApiResponse::success(VarianceReview {
        variances: workflow.nonzero_variances(),
        pending: workflow.pending,
    })))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustmentCreated {
    pub transaction_id: Uuid,
}

/// Posts the adjustment transaction for the reviewed count.
#[utoipa::path(
    post,
    path = "/api/v1/counts/{id}/adjustment",
    params(("id" = Uuid, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Adjustment created", body = AdjustmentCreated),
        (status = 400, description = "Workflow not at the variance step", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn generate_adjustment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdjustmentCreated>>, ServiceError> {
    let transaction_id = state.services.counts.generate_adjustment(id, user.id).await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::GenerateAdjustment,
            json!({ "transaction_id": transaction_id }),
        )
        .await;

    Ok(Json(ApiResponse::success(AdjustmentCreated {
        transaction_id,
    })))
}

/// Steps back one position in the linear flow.
pub async fn back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CountWorkflow>>, ServiceError> {
    Ok(Json(ApiResponse::success(state.services.counts.back(id)?)))
}
