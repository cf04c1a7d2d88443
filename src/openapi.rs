use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WIMS API",
        version = "0.3.0",
        description = r#"
# Warehouse Inventory Management API

Physical-count reconciliation, master-data administration, inbound /
outbound / adjustment / transfer transactions, and reporting.

## Authentication

All endpoints except `/api/v1/auth/login`, `/api/v1/status` and
`/api/v1/health` require a bearer token from the login endpoint:

```
Authorization: Bearer <your-jwt-token>
```

Master-data endpoints additionally require the `admin` role.

## Error Handling

Errors use a consistent JSON body with the HTTP status category, a
human-readable message, and the request id for correlation.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Sign-in, session and user administration"),
        (name = "inventory", description = "On-hand positions and snapshots"),
        (name = "counts", description = "Physical count reconciliation workflow"),
        (name = "transactions", description = "Inbound/outbound/adjustment/transfer transactions"),
        (name = "master-data", description = "Reference table administration"),
        (name = "reports", description = "Canned and ad-hoc reports")
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::create_user,

        // Inventory
        crate::handlers::inventory::on_hand,
        crate::handlers::inventory::snapshot,

        // Counts
        crate::handlers::counts::review_variances,
        crate::handlers::counts::generate_adjustment,

        // Transactions
        crate::handlers::transactions::list,
        crate::handlers::transactions::create,
        crate::handlers::transactions::create_transfer,
        crate::handlers::transactions::delete_header,

        // Master data
        crate::handlers::master_data::add_record,

        // Reports
        crate::handlers::reports::manual_report,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Auth types
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::CreateUserRequest,
            crate::handlers::auth::UserInfo,

            // Inventory types
            crate::models::InventoryStatus,
            crate::models::LineStatus,
            crate::models::TransactionType,
            crate::models::OnHand,
            crate::services::inventory::InventorySnapshot,
            crate::services::inventory::SnapshotLine,
            crate::services::inventory::OnHandRow,

            // Count types
            crate::services::counts::CountStep,
            crate::services::counts::CountLine,
            crate::services::counts::VarianceLine,
            crate::services::counts::PendingTransactionLine,
            crate::handlers::counts::VarianceReview,
            crate::handlers::counts::AdjustmentCreated,

            // Transaction types
            crate::services::transactions::NewTransaction,
            crate::services::transactions::NewTransactionLine,
            crate::services::transactions::NewTransferOrder,
            crate::services::transactions::TransactionView,
            crate::services::transactions::TransactionDetailView,

            // Report types
            crate::services::reports::ManualReportRequest,
            crate::services::reports::ReportFilter,
            crate::services::reports::FilterOperator,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("WIMS API"));
        assert!(json.contains("/api/v1/transactions"));
        assert!(json.contains("/api/v1/reports/manual"));
    }
}
