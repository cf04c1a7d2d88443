use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_header")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: Uuid,
    /// Inbound, Outbound or Adjustment.
    pub transaction_type: String,
    pub transaction_date: Date,
    pub warehouse: Option<String>,
    pub reference_type: Option<String>,
    /// Unique per prefix, allocated sequentially (IB-/OB-/ADJ- + 100001...).
    #[sea_orm(unique)]
    pub reference_number: String,
    pub shipment_carrier: Option<String>,
    pub shipping_document: Option<String>,
    pub customer_po: Option<String>,
    pub customer_name: Option<String>,
    pub comments: Option<String>,
    /// For transfer pairs: the inbound leg points at the outbound leg.
    pub related_transaction_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub last_edited_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_detail::Entity")]
    TransactionDetail,
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::Warehouse",
        to = "super::warehouse::Column::CommonName"
    )]
    Warehouse,
}

impl Related<super::transaction_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionDetail.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
