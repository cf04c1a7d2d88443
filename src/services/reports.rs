//! Read-and-shape reports over the transaction and inventory views, plus
//! the constrained ad-hoc "manual" report builder.

use crate::{
    db::DbPool,
    entities::{
        inventory_summary::{self, Entity as InventorySummary},
        item::{self, Entity as Item},
        transaction_full::{self, Entity as TransactionFull},
    },
    errors::ServiceError,
    services::transactions::{group_view_rows, TransactionView},
};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Func, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JsonValue, PaginatorTrait,
    QueryFilter, QueryOrder, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Hard cap on manual report result size.
const MANUAL_REPORT_LIMIT: u64 = 1000;

/// Quantity breakdown by inventory status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct StatusBreakdown {
    pub total: Decimal,
    pub stock: Decimal,
    pub consignment: Decimal,
    pub hold: Decimal,
}

impl StatusBreakdown {
    fn add(&mut self, other: StatusBreakdown) {
        self.total += other.total;
        self.stock += other.stock;
        self.consignment += other.consignment;
        self.hold += other.hold;
    }
}

/// One warehouse's position for an item.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WarehousePosition {
    pub warehouse: String,
    pub on_hand: StatusBreakdown,
    pub inbound: StatusBreakdown,
    pub scheduled_outbound: StatusBreakdown,
    pub future: StatusBreakdown,
}

impl From<&inventory_summary::Model> for WarehousePosition {
    fn from(row: &inventory_summary::Model) -> Self {
        Self {
            warehouse: row.warehouse.clone(),
            on_hand: StatusBreakdown {
                total: row.on_hand_total,
                stock: row.on_hand_stock,
                consignment: row.on_hand_consignment,
                hold: row.on_hand_hold,
            },
            inbound: StatusBreakdown {
                total: row.inbound_total,
                stock: row.inbound_stock,
                consignment: row.inbound_consignment,
                hold: row.inbound_hold,
            },
            scheduled_outbound: StatusBreakdown {
                total: row.scheduled_outbound_total,
                stock: row.scheduled_outbound_stock,
                consignment: row.scheduled_outbound_consignment,
                hold: row.scheduled_outbound_hold,
            },
            future: StatusBreakdown {
                total: row.future_total,
                stock: row.future_stock,
                consignment: row.future_consignment,
                hold: row.future_hold,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerReport {
    pub all_transactions: Vec<TransactionView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemReport {
    pub item_name: String,
    pub total_on_hand: StatusBreakdown,
    pub by_warehouse: Vec<WarehousePosition>,
    pub transactions: Vec<TransactionView>,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductItemSummary {
    pub item_name: String,
    pub total_on_hand: StatusBreakdown,
    pub by_warehouse: Vec<WarehousePosition>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductReport {
    pub product_name: String,
    pub items: Vec<ProductItemSummary>,
    pub transactions: Vec<TransactionView>,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WarehouseReport {
    pub warehouse_name: String,
    pub items: Vec<WarehouseReportItem>,
    pub transactions: Vec<TransactionView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WarehouseReportItem {
    pub item_name: String,
    pub position: WarehousePosition,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NegativeInventoryReport {
    pub negative_items: Vec<NegativeInventoryRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NegativeInventoryRow {
    pub item_name: String,
    pub warehouse: String,
    pub on_hand_total: Decimal,
}

// ---------------------------------------------------------------------------
// Manual report builder

/// A view reachable from the manual report builder, with its full column
/// whitelist. Nothing outside this registry can be queried.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub static REPORT_VIEWS: &[ReportView] = &[
    ReportView {
        name: "vw_transaction_full",
        columns: &[
            "transaction_id",
            "transaction_type",
            "transaction_date",
            "reference_type",
            "reference_number",
            "customer_po",
            "customer_name",
            "warehouse",
            "shipment_carrier",
            "shipping_document",
            "header_comments",
            "header_created_at",
            "header_last_updated_at",
            "detail_id",
            "item_name",
            "quantity",
            "inventory_status",
            "lot_number",
            "detail_comments",
            "detail_status",
        ],
    },
    ReportView {
        name: "inventory_view",
        columns: &[
            "item_name",
            "warehouse",
            "as_of_date",
            "on_hand_total",
            "on_hand_stock",
            "on_hand_consignment",
            "on_hand_hold",
            "inbound_total",
            "inbound_stock",
            "inbound_consignment",
            "inbound_hold",
            "scheduled_outbound_total",
            "scheduled_outbound_stock",
            "scheduled_outbound_consignment",
            "scheduled_outbound_hold",
            "future_total",
            "future_stock",
            "future_consignment",
            "future_hold",
        ],
    },
];

pub fn report_view(name: &str) -> Option<&'static ReportView> {
    REPORT_VIEWS.iter().find(|view| view.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReportFilter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ManualReportRequest {
    pub view: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
}

/// How a raw filter value will be bound.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Number(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Text(String),
}

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap());

/// Classifies a raw filter value: numeric passthrough, ISO date, ISO
/// timestamp, otherwise plain text. The classified value is always bound
/// as a statement parameter.
pub fn classify_value(raw: &str) -> BoundValue {
    if let Ok(number) = Decimal::from_str(raw.trim()) {
        return BoundValue::Number(number);
    }
    if DATE_RE.is_match(raw) {
        if let Ok(date) = NaiveDate::from_str(raw) {
            return BoundValue::Date(date);
        }
    }
    if TIMESTAMP_RE.is_match(raw) {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return BoundValue::Timestamp(ts);
        }
    }
    BoundValue::Text(raw.to_string())
}

impl From<BoundValue> for Value {
    fn from(value: BoundValue) -> Self {
        match value {
            BoundValue::Number(n) => Value::Decimal(Some(Box::new(n))),
            BoundValue::Date(d) => Value::ChronoDate(Some(Box::new(d))),
            BoundValue::Timestamp(t) => Value::ChronoDateTime(Some(Box::new(t))),
            BoundValue::Text(s) => Value::String(Some(Box::new(s))),
        }
    }
}

/// Builds one WHERE condition. Column names were already validated against
/// the view registry; values become bound parameters (IN/NOT IN split on
/// commas, the LIKE family wraps in `%…%`).
pub fn build_condition(filter: &ReportFilter) -> SimpleExpr {
    let column = Expr::col(Alias::new(filter.column.as_str()));
    match filter.operator {
        FilterOperator::Eq => column.eq(Value::from(classify_value(&filter.value))),
        FilterOperator::Ne => column.ne(Value::from(classify_value(&filter.value))),
        FilterOperator::Gt => column.gt(Value::from(classify_value(&filter.value))),
        FilterOperator::Gte => column.gte(Value::from(classify_value(&filter.value))),
        FilterOperator::Lt => column.lt(Value::from(classify_value(&filter.value))),
        FilterOperator::Lte => column.lte(Value::from(classify_value(&filter.value))),
        FilterOperator::Like => column.like(format!("%{}%", filter.value)),
        FilterOperator::NotLike => column.not_like(format!("%{}%", filter.value)),
        FilterOperator::ILike => SimpleExpr::from(Func::lower(Expr::col(Alias::new(
            filter.column.as_str(),
        ))))
        .like(format!("%{}%", filter.value.to_lowercase())),
        FilterOperator::In => column.is_in(
            filter
                .value
                .split(',')
                .map(|part| Value::from(classify_value(part.trim()))),
        ),
        FilterOperator::NotIn => column.is_not_in(
            filter
                .value
                .split(',')
                .map(|part| Value::from(classify_value(part.trim()))),
        ),
    }
}

/// Validates a manual report request against the view registry.
pub fn validate_manual_request(request: &ManualReportRequest) -> Result<&'static ReportView, ServiceError> {
    let view = report_view(&request.view)
        .ok_or_else(|| ServiceError::ValidationError("Invalid view name".into()))?;

    if request.columns.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one column is required".into(),
        ));
    }
    for column in &request.columns {
        if !view.columns.contains(&column.as_str()) {
            return Err(ServiceError::ValidationError(
                "Invalid column selection".into(),
            ));
        }
    }
    for filter in &request.filters {
        if !view.columns.contains(&filter.column.as_str()) {
            return Err(ServiceError::ValidationError(
                "Invalid filter column".into(),
            ));
        }
    }
    Ok(view)
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn summary_rows(
        &self,
        filter: Option<sea_orm::Condition>,
    ) -> Result<Vec<inventory_summary::Model>, ServiceError> {
        let mut query = InventorySummary::find().order_by_asc(inventory_summary::Column::ItemName);
        if let Some(condition) = filter {
            query = query.filter(condition);
        }
        query
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Recent transactions with their lines, newest first.
    #[instrument(skip(self))]
    pub async fn customer_report(&self) -> Result<CustomerReport, ServiceError> {
        let rows = TransactionFull::find()
            .order_by_desc(transaction_full::Column::TransactionDate)
            .paginate(self.db.as_ref(), MANUAL_REPORT_LIMIT)
            .fetch_page(0)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(CustomerReport {
            all_transactions: group_view_rows(rows),
        })
    }

    /// One item's position per warehouse plus its transaction history.
    #[instrument(skip(self))]
    pub async fn item_report(&self, item_name: &str) -> Result<ItemReport, ServiceError> {
        let summary = self
            .summary_rows(Some(
                sea_orm::Condition::all()
                    .add(inventory_summary::Column::ItemName.eq(item_name)),
            ))
            .await?;

        let by_warehouse: Vec<WarehousePosition> =
            summary.iter().map(WarehousePosition::from).collect();
        let mut total_on_hand = StatusBreakdown::default();
        for position in &by_warehouse {
            total_on_hand.add(position.on_hand);
        }

        let rows = TransactionFull::find()
            .filter(transaction_full::Column::ItemName.eq(item_name))
            .order_by_desc(transaction_full::Column::TransactionDate)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let transactions = group_view_rows(rows);

        Ok(ItemReport {
            item_name: item_name.to_string(),
            total_on_hand,
            transaction_count: transactions.len(),
            by_warehouse,
            transactions,
        })
    }

    /// Positions and history for every item belonging to a product.
    #[instrument(skip(self))]
    pub async fn product_report(&self, product_name: &str) -> Result<ProductReport, ServiceError> {
        let item_names: Vec<String> = Item::find()
            .filter(item::Column::ProductName.eq(product_name))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|i| i.item_name)
            .collect();

        if item_names.is_empty() {
            return Ok(ProductReport {
                product_name: product_name.to_string(),
                items: Vec::new(),
                transactions: Vec::new(),
                transaction_count: 0,
            });
        }

        let summary = self
            .summary_rows(Some(
                sea_orm::Condition::all()
                    .add(inventory_summary::Column::ItemName.is_in(item_names.clone())),
            ))
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, ProductItemSummary> = HashMap::new();
        for row in &summary {
            let entry = grouped
                .entry(row.item_name.clone())
                .or_insert_with(|| {
                    order.push(row.item_name.clone());
                    ProductItemSummary {
                        item_name: row.item_name.clone(),
                        total_on_hand: StatusBreakdown::default(),
                        by_warehouse: Vec::new(),
                    }
                });
            let position = WarehousePosition::from(row);
            entry.total_on_hand.add(position.on_hand);
            entry.by_warehouse.push(position);
        }
        let items: Vec<ProductItemSummary> = order
            .into_iter()
            .filter_map(|name| grouped.remove(&name))
            .collect();

        let rows = TransactionFull::find()
            .filter(transaction_full::Column::ItemName.is_in(item_names))
            .order_by_desc(transaction_full::Column::TransactionDate)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let transactions = group_view_rows(rows);

        Ok(ProductReport {
            product_name: product_name.to_string(),
            items,
            transaction_count: transactions.len(),
            transactions,
        })
    }

    /// Every item position at one warehouse plus its transactions.
    #[instrument(skip(self))]
    pub async fn warehouse_report(
        &self,
        warehouse_name: &str,
    ) -> Result<WarehouseReport, ServiceError> {
        let summary = self
            .summary_rows(Some(
                sea_orm::Condition::all()
                    .add(inventory_summary::Column::Warehouse.eq(warehouse_name)),
            ))
            .await?;

        let items = summary
            .iter()
            .map(|row| WarehouseReportItem {
                item_name: row.item_name.clone(),
                position: WarehousePosition::from(row),
            })
            .collect();

        let rows = TransactionFull::find()
            .filter(transaction_full::Column::Warehouse.eq(warehouse_name))
            .order_by_desc(transaction_full::Column::TransactionDate)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(WarehouseReport {
            warehouse_name: warehouse_name.to_string(),
            items,
            transactions: group_view_rows(rows),
        })
    }

    /// Items whose on-hand total has gone negative anywhere.
    #[instrument(skip(self))]
    pub async fn negative_inventory_report(
        &self,
    ) -> Result<NegativeInventoryReport, ServiceError> {
        let summary = self
            .summary_rows(Some(
                sea_orm::Condition::all()
                    .add(inventory_summary::Column::OnHandTotal.lt(Decimal::ZERO)),
            ))
            .await?;

        Ok(NegativeInventoryReport {
            negative_items: summary
                .into_iter()
                .map(|row| NegativeInventoryRow {
                    item_name: row.item_name,
                    warehouse: row.warehouse,
                    on_hand_total: row.on_hand_total,
                })
                .collect(),
        })
    }

    /// The full inventory view, unfiltered.
    pub async fn all_inventory_report(
        &self,
    ) -> Result<Vec<inventory_summary::Model>, ServiceError> {
        self.summary_rows(None).await
    }

    /// Runs a manual report: view, columns and filter columns are checked
    /// against the static registry, the statement is built with bound
    /// parameters only, and results are capped at 1000 rows.
    #[instrument(skip(self, request))]
    pub async fn manual_report(
        &self,
        request: ManualReportRequest,
    ) -> Result<Vec<JsonValue>, ServiceError> {
        let view = validate_manual_request(&request)?;

        let mut select = Query::select();
        select.from(Alias::new(view.name));
        for column in &request.columns {
            select.column(Alias::new(column.as_str()));
        }
        for filter in &request.filters {
            select.and_where(build_condition(filter));
        }
        select.limit(MANUAL_REPORT_LIMIT);

        let stmt = self.db.get_database_backend().build(&select);
        JsonValue::find_by_statement(stmt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn request(view: &str, columns: &[&str]) -> ManualReportRequest {
        ManualReportRequest {
            view: view.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            filters: Vec::new(),
        }
    }

    #[test]
    fn unknown_views_are_rejected() {
        let err = validate_manual_request(&request("pg_catalog.pg_tables", &["item_name"]))
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) => {
            assert_eq!(msg, "Invalid view name");
        });
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = validate_manual_request(&request(
            "inventory_view",
            &["item_name", "password_hash"],
        ))
        .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) => {
            assert_eq!(msg, "Invalid column selection");
        });
    }

    #[test]
    fn filter_columns_are_validated_too() {
        let mut req = request("inventory_view", &["item_name"]);
        req.filters.push(ReportFilter {
            column: "item_name; DROP TABLE item".into(),
            operator: FilterOperator::Eq,
            value: "x".into(),
        });
        let err = validate_manual_request(&req).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) => {
            assert_eq!(msg, "Invalid filter column");
        });
    }

    #[test]
    fn valid_requests_pass() {
        let mut req = request("vw_transaction_full", &["reference_number", "quantity"]);
        req.filters.push(ReportFilter {
            column: "warehouse".into(),
            operator: FilterOperator::Eq,
            value: "W1".into(),
        });
        assert!(validate_manual_request(&req).is_ok());
    }

    #[test_case("42", BoundValue::Number(dec!(42)); "integer")]
    #[test_case("-3.5", BoundValue::Number(dec!(-3.5)); "negative decimal")]
    #[test_case("2024-01-15", BoundValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()); "iso date")]
    #[test_case("W1", BoundValue::Text("W1".into()); "plain text")]
    fn values_classify_by_shape(raw: &str, expected: BoundValue) {
        assert_eq!(classify_value(raw), expected);
    }

    #[test]
    fn timestamps_classify_as_timestamps() {
        assert_matches!(
            classify_value("2024-01-15 10:30:00"),
            BoundValue::Timestamp(_)
        );
    }

    #[test]
    fn hostile_values_stay_plain_text() {
        // A classic injection payload never reaches the SQL text; it is
        // classified as text and bound as a parameter.
        let payload = "'; DROP TABLE transaction_header; --";
        assert_eq!(classify_value(payload), BoundValue::Text(payload.into()));
    }

    fn build_sql(filter: ReportFilter) -> (String, sea_orm::sea_query::Values) {
        let mut select = Query::select();
        select
            .from(Alias::new("inventory_view"))
            .column(Alias::new("item_name"))
            .and_where(build_condition(&filter));
        select.build(sea_orm::sea_query::SqliteQueryBuilder)
    }

    #[test]
    fn in_operator_splits_comma_lists_into_bound_values() {
        let (sql, values) = build_sql(ReportFilter {
            column: "warehouse".into(),
            operator: FilterOperator::In,
            value: "W1, W2, W3".into(),
        });
        assert!(sql.contains("IN"));
        assert_eq!(values.0.len(), 3);
    }

    #[test]
    fn like_wraps_value_in_wildcards() {
        let (sql, values) = build_sql(ReportFilter {
            column: "item_name".into(),
            operator: FilterOperator::Like,
            value: "Widget".into(),
        });
        assert!(sql.contains("LIKE"));
        assert_eq!(values.0.len(), 1);
        assert_eq!(format!("{:?}", values.0[0]), format!("{:?}", Value::from("%Widget%")));
    }

    #[test]
    fn user_values_never_appear_in_the_sql_text() {
        let payload = "'; DROP TABLE transaction_header; --";
        let (sql, values) = build_sql(ReportFilter {
            column: "warehouse".into(),
            operator: FilterOperator::Eq,
            value: payload.into(),
        });
        assert!(!sql.contains("DROP TABLE"));
        assert_eq!(values.0.len(), 1);
    }
}
