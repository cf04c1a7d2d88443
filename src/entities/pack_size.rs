use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pack_size")]
pub struct Model {
    /// Display string such as "2x2.5 gal/case", derived from the numeric
    /// fields at insert time.
    #[sea_orm(primary_key, auto_increment = false)]
    pub pack_size: String,
    #[sea_orm(unique)]
    pub id: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub units_per_each: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub volume_per_unit: Decimal,
    pub units_of_units: String,
    pub package_type: String,
    /// Volume per case: units_per_each * volume_per_unit. Drives case-count
    /// conversion during physical counts.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub uom_per_each: Option<Decimal>,
    pub eaches_per_pallet: Option<i32>,
    pub pallets_per_tl: Option<i32>,
    pub eaches_per_tl: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::units_of_units::Entity",
        from = "Column::UnitsOfUnits",
        to = "super::units_of_units::Column::UnitsOfUnits"
    )]
    UnitsOfUnits,
    #[sea_orm(
        belongs_to = "super::case_type::Entity",
        from = "Column::PackageType",
        to = "super::case_type::Column::PackageType"
    )]
    CaseType,
    #[sea_orm(has_many = "super::item::Entity")]
    Item,
}

impl Related<super::units_of_units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitsOfUnits.def()
    }
}

impl Related<super::case_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CaseType.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
