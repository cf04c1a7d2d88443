use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_name: String,
    pub registrant: String,
    pub product_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::registrant::Entity",
        from = "Column::Registrant",
        to = "super::registrant::Column::Registrant"
    )]
    Registrant,
    #[sea_orm(
        belongs_to = "super::product_type::Entity",
        from = "Column::ProductType",
        to = "super::product_type::Column::ProductType"
    )]
    ProductType,
    #[sea_orm(has_many = "super::item::Entity")]
    Item,
}

impl Related<super::registrant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registrant.def()
    }
}

impl Related<super::product_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductType.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
