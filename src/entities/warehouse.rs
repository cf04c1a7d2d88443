use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse")]
pub struct Model {
    /// Common name used as the key across transactions and reports.
    #[sea_orm(primary_key, auto_increment = false)]
    pub common_name: String,
    pub location_id: Option<String>,
    pub establishment_name: Option<String>,
    pub epa: Option<String>,
    pub abbreviation: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub contact_name: Option<String>,
    pub location_hours: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_header::Entity")]
    TransactionHeader,
}

impl Related<super::transaction_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionHeader.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
