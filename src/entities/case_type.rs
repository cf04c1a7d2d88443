use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "case_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub package_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::pack_size::Entity")]
    PackSize,
}

impl Related<super::pack_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackSize.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
