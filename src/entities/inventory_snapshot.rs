use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Read model over the `transactions_inventory_snapshot_by_date` view:
/// cumulative on-hand per (item, warehouse) as of each transaction date.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions_inventory_snapshot_by_date")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_name: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub warehouse: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_consignment: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_hold: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_total: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
