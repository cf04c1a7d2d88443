use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Read model over the `inventory_view` view: current position per
/// (item, warehouse): on-hand by status plus pending inbound and
/// scheduled outbound, and the projected future position.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_view")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_name: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub warehouse: String,
    pub as_of_date: Option<Date>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_consignment: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub on_hand_hold: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub inbound_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub inbound_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub inbound_consignment: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub inbound_hold: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub scheduled_outbound_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub scheduled_outbound_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub scheduled_outbound_consignment: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub scheduled_outbound_hold: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub future_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub future_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub future_consignment: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub future_hold: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
