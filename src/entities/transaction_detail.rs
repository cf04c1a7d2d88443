use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_detail")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub detail_id: Uuid,
    pub transaction_id: Uuid,
    pub item_name: String,
    /// Signed: adjustment lines carry negative quantities for shortages.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    /// Stock, Consignment or Hold.
    pub inventory_status: String,
    /// Pending, Shipped, Received or Completed; constrained by the header's
    /// transaction type.
    pub status: String,
    pub lot_number: Option<String>,
    pub comments: Option<String>,
    pub created_by: Option<Uuid>,
    pub last_edited_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction_header::Entity",
        from = "Column::TransactionId",
        to = "super::transaction_header::Column::TransactionId"
    )]
    TransactionHeader,
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemName",
        to = "super::item::Column::ItemName"
    )]
    Item,
}

impl Related<super::transaction_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionHeader.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
