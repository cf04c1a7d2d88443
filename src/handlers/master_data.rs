use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::master_data::{FieldType, TABLES},
    services::sessions::ActionKind,
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/{table}", get(list_records).post(add_record))
        .route("/{table}/options", get(foreign_key_options))
        .route(
            "/{table}/{key}",
            axum::routing::put(update_record).delete(delete_record),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TableInfo {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: HashMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ColumnInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
    pub required: bool,
}

/// The editable table registry, for building the admin UI.
pub async fn list_tables() -> Json<ApiResponse<Vec<TableInfo>>> {
    let tables = TABLES
        .iter()
        .map(|spec| TableInfo {
            name: spec.name,
            primary_key: spec.primary_key,
            columns: spec
                .columns
                .iter()
                .map(|col| ColumnInfo {
                    name: col.name,
                    ty: match col.ty {
                        FieldType::Text => "text",
                        FieldType::Integer => "integer",
                        FieldType::Decimal => "decimal",
                    },
                    required: col.required,
                })
                .collect(),
            foreign_keys: spec
                .foreign_keys
                .iter()
                .map(|fk| (fk.column, fk.table))
                .collect(),
        })
        .collect();
    Json(ApiResponse::success(tables))
}

pub async fn list_records(
    State(state): State<AppState>,
    user: AuthUser,
    Path(table): Path<String>,
) -> Result<Json<ApiResponse<Vec<JsonValue>>>, ServiceError> {
    let records = state.services.master_data.list(&table).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::ViewMasterData,
            json!({ "table": table }),
        )
        .await;
    Ok(Json(ApiResponse::success(records)))
}

pub async fn foreign_key_options(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<ApiResponse<HashMap<String, Vec<JsonValue>>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.master_data.foreign_key_options(&table).await?,
    )))
}

/// Inserts one record; derived fields (pack-size string, item name) are
/// computed server-side.
#[utoipa::path(
    post,
    path = "/api/v1/master-data/{table}",
    params(("table" = String, Path, description = "Registry table name")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Record added"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown table", body = crate::errors::ErrorResponse)
    ),
    tag = "master-data"
)]
pub async fn add_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(table): Path<String>,
    Json(record): Json<JsonMap<String, JsonValue>>,
) -> Result<Json<ApiResponse<JsonValue>>, ServiceError> {
    let inserted = state.services.master_data.insert(&table, record).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::AddRecord,
            json!({ "table": table }),
        )
        .await;
    Ok(Json(ApiResponse::success(inserted)))
}

pub async fn update_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path((table, key)): Path<(String, String)>,
    Json(record): Json<JsonMap<String, JsonValue>>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.master_data.update(&table, &key, record).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::UpdateRecord,
            json!({ "table": table, "key": key }),
        )
        .await;
    Ok(Json(ApiResponse::success(())))
}

pub async fn delete_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path((table, key)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.master_data.delete(&table, &key).await?;
    state
        .services
        .sessions
        .try_record_action(
            user.session.as_ref(),
            ActionKind::DeleteRecord,
            json!({ "table": table, "key": key }),
        )
        .await;
    Ok(Json(ApiResponse::success(())))
}
