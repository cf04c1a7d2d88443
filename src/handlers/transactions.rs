use crate::{
    auth::AuthUser,
    entities::transaction_header,
    errors::ServiceError,
    services::sessions::ActionKind,
    services::transactions::{
        NewTransaction, NewTransferOrder, TransactionView, UpdateTransactionDetail,
        UpdateTransactionHeader,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/transfer", post(create_transfer))
        .route(
            "/{id}",
            get(get_one).put(update_header).delete(delete_header),
        )
        .route(
            "/{id}/details/{detail_id}",
            axum::routing::put(update_detail).delete(delete_detail),
        )
}

/// All transactions with their lines, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transactions returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<TransactionView>>>, ServiceError> {
    let transactions = state.services.transactions.list().await?;
    state
        .services
        .sessions
        .try_record_action(user.session.as_ref(), ActionKind::ViewTransactions, json!({}))
        .await;
    Ok(Json(ApiResponse::success(transactions)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransactionView>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.transactions.get(id).await?,
    )))
}

/// Creates a transaction; the line status must belong to the type's
/// allowed subset.
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = NewTransaction,
    responses(
        (status = 200, description = "Transaction created"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewTransaction>,
) -> Result<Json<ApiResponse<transaction_header::Model>>, ServiceError> {
    let header = state.services.transactions.create(request, user.id).await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::CreateTransaction,
            json!({ "reference_number": header.reference_number }),
        )
        .await;

    Ok(Json(ApiResponse::success(header)))
}

#[derive(Debug, Serialize)]
pub struct TransferCreated {
    pub outbound: transaction_header::Model,
    pub inbound: transaction_header::Model,
}

/// Creates the paired Outbound and Inbound legs of a transfer order.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/transfer",
    request_body = NewTransferOrder,
    responses(
        (status = 200, description = "Transfer created"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewTransferOrder>,
) -> Result<Json<ApiResponse<TransferCreated>>, ServiceError> {
    let (outbound, inbound) = state
        .services
        .transactions
        .create_transfer(request, state.config.transfer_lead_days, user.id)
        .await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::CreateTransaction,
            json!({
                "reference_number": outbound.reference_number,
                "related_reference": inbound.reference_number,
            }),
        )
        .await;

    Ok(Json(ApiResponse::success(TransferCreated {
        outbound,
        inbound,
    })))
}

pub async fn update_header(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTransactionHeader>,
) -> Result<Json<ApiResponse<transaction_header::Model>>, ServiceError> {
    let header = state
        .services
        .transactions
        .update_header(id, request, user.id)
        .await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::UpdateTransaction,
            json!({ "transaction_id": id }),
        )
        .await;

    Ok(Json(ApiResponse::success(header)))
}

/// Updates one detail line; the status is validated against the header's
/// transaction type before the write.
pub async fn update_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateTransactionDetail>,
) -> Result<Json<ApiResponse<crate::entities::transaction_detail::Model>>, ServiceError> {
    let detail = state
        .services
        .transactions
        .update_detail(id, detail_id, request, user.id)
        .await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::UpdateTransaction,
            json!({ "transaction_id": id, "detail_id": detail_id }),
        )
        .await;

    Ok(Json(ApiResponse::success(detail)))
}

pub async fn delete_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.transactions.delete_detail(id, detail_id).await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::DeleteTransaction,
            json!({ "transaction_id": id, "detail_id": detail_id }),
        )
        .await;

    Ok(Json(ApiResponse::success(())))
}

/// Deletes a header and its details; refused while a transfer partner
/// still references it.
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Blocked by related transactions", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn delete_header(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.transactions.delete_header(id).await?;

    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::DeleteTransaction,
            json!({ "transaction_id": id }),
        )
        .await;

    Ok(Json(ApiResponse::success(())))
}
