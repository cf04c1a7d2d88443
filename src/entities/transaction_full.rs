use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Read model over the `vw_transaction_full` view: one row per detail line
/// with its header fields and creator/editor display names flattened in.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vw_transaction_full")]
pub struct Model {
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub transaction_date: Date,
    pub reference_type: Option<String>,
    pub reference_number: String,
    pub customer_po: Option<String>,
    pub customer_name: Option<String>,
    pub warehouse: Option<String>,
    pub shipment_carrier: Option<String>,
    pub shipping_document: Option<String>,
    pub header_comments: Option<String>,
    pub related_transaction_id: Option<Uuid>,
    pub header_created_at: DateTimeWithTimeZone,
    pub header_last_updated_at: DateTimeWithTimeZone,
    #[sea_orm(primary_key, auto_increment = false)]
    pub detail_id: Uuid,
    pub item_name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    pub inventory_status: String,
    pub lot_number: Option<String>,
    pub detail_comments: Option<String>,
    pub detail_status: String,
    pub created_by: Option<Uuid>,
    pub last_edited_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub last_edited_by_name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
