//! Generic CRUD over the fixed set of reference tables, driven by a
//! compile-time table registry. Records cross the boundary as JSON objects
//! and are validated against the registry (names and types) before any
//! statement is built; values are always bound, never interpolated.

use crate::{db::DbPool, errors::ServiceError};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{ConnectionTrait, Value};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKeySpec {
    pub column: &'static str,
    pub table: &'static str,
    pub references: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnSpec],
    pub foreign_keys: &'static [ForeignKeySpec],
}

const fn text(name: &'static str, required: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: FieldType::Text,
        required,
    }
}

const fn integer(name: &'static str, required: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: FieldType::Integer,
        required,
    }
}

const fn decimal(name: &'static str, required: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: FieldType::Decimal,
        required,
    }
}

/// The editable reference tables. Anything not listed here cannot be
/// reached through the master-data API.
pub static TABLES: &[TableSpec] = &[
    TableSpec {
        name: "product",
        primary_key: "product_name",
        columns: &[
            text("product_name", true),
            text("registrant", true),
            text("product_type", true),
        ],
        foreign_keys: &[
            ForeignKeySpec {
                column: "registrant",
                table: "registrant",
                references: "registrant",
            },
            ForeignKeySpec {
                column: "product_type",
                table: "product_type",
                references: "product_type",
            },
        ],
    },
    TableSpec {
        name: "item",
        primary_key: "item_name",
        columns: &[
            text("item_name", false),
            text("product_name", true),
            text("pack_size", true),
        ],
        foreign_keys: &[
            ForeignKeySpec {
                column: "product_name",
                table: "product",
                references: "product_name",
            },
            ForeignKeySpec {
                column: "pack_size",
                table: "pack_size",
                references: "pack_size",
            },
        ],
    },
    TableSpec {
        name: "pack_size",
        primary_key: "pack_size",
        columns: &[
            text("pack_size", false),
            integer("id", false),
            decimal("units_per_each", true),
            decimal("volume_per_unit", true),
            text("units_of_units", true),
            text("package_type", true),
            decimal("uom_per_each", false),
            integer("eaches_per_pallet", false),
            integer("pallets_per_tl", false),
            integer("eaches_per_tl", false),
        ],
        foreign_keys: &[
            ForeignKeySpec {
                column: "units_of_units",
                table: "units_of_units",
                references: "units_of_units",
            },
            ForeignKeySpec {
                column: "package_type",
                table: "case_type",
                references: "package_type",
            },
        ],
    },
    TableSpec {
        name: "warehouse",
        primary_key: "common_name",
        columns: &[
            text("common_name", true),
            text("location_id", false),
            text("establishment_name", false),
            text("epa", false),
            text("abbreviation", false),
            text("street", false),
            text("city", false),
            text("state", false),
            text("zip", false),
            text("phone", false),
            text("contact_name", false),
            text("location_hours", false),
        ],
        foreign_keys: &[],
    },
    TableSpec {
        name: "case_type",
        primary_key: "package_type",
        columns: &[text("package_type", true)],
        foreign_keys: &[],
    },
    TableSpec {
        name: "product_type",
        primary_key: "product_type",
        columns: &[text("product_type", true)],
        foreign_keys: &[],
    },
    TableSpec {
        name: "registrant",
        primary_key: "registrant",
        columns: &[text("registrant", true)],
        foreign_keys: &[],
    },
    TableSpec {
        name: "units_of_units",
        primary_key: "units_of_units",
        columns: &[text("units_of_units", true)],
        foreign_keys: &[],
    },
];

pub fn table_spec(name: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|spec| spec.name == name)
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|col| col.name == name)
    }
}

/// Builds the derived pack-size display string, e.g. "2x2.5 gal/case" or
/// "2.5 gal/drum" when there is a single unit per each.
pub fn generate_pack_size(
    units_per_each: Decimal,
    volume_per_unit: Decimal,
    units_of_units: &str,
    package_type: &str,
) -> String {
    if units_per_each == Decimal::ONE {
        format!(
            "{} {}/{}",
            volume_per_unit.normalize(),
            units_of_units.to_lowercase(),
            package_type.to_lowercase()
        )
    } else {
        format!(
            "{}x{} {}/{}",
            units_per_each.normalize(),
            volume_per_unit.normalize(),
            units_of_units.to_lowercase(),
            package_type.to_lowercase()
        )
    }
}

pub fn generate_item_name(product_name: &str, pack_size: &str) -> String {
    format!("{} {}", product_name, pack_size)
}

pub fn uom_per_each(units_per_each: Decimal, volume_per_unit: Decimal) -> Decimal {
    units_per_each * volume_per_unit
}

fn coerce_value(
    table: &str,
    column: &ColumnSpec,
    value: &JsonValue,
) -> Result<Value, ServiceError> {
    if value.is_null() {
        return if column.required {
            Err(ServiceError::ValidationError(format!(
                "{}.{} may not be null",
                table, column.name
            )))
        } else {
            Ok(match column.ty {
                FieldType::Text => Value::String(None),
                FieldType::Integer => Value::BigInt(None),
                FieldType::Decimal => Value::Decimal(None),
            })
        };
    }

    match column.ty {
        FieldType::Text => value
            .as_str()
            .map(|s| Value::String(Some(Box::new(s.to_string()))))
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "{}.{} must be a string",
                    table, column.name
                ))
            }),
        FieldType::Integer => value.as_i64().map(|n| Value::BigInt(Some(n))).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "{}.{} must be an integer",
                table, column.name
            ))
        }),
        FieldType::Decimal => {
            let parsed = match value {
                JsonValue::Number(n) => Decimal::from_str(&n.to_string()).ok(),
                JsonValue::String(s) => Decimal::from_str(s).ok(),
                _ => None,
            };
            parsed
                .map(|d| Value::Decimal(Some(Box::new(d))))
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "{}.{} must be a decimal number",
                        table, column.name
                    ))
                })
        }
    }
}

/// Validates a record against the table registry, returning bound column
/// values in registry order. With `partial`, absent columns are skipped;
/// otherwise required columns must be present.
fn validate_record(
    spec: &TableSpec,
    record: &JsonMap<String, JsonValue>,
    partial: bool,
) -> Result<Vec<(&'static str, Value)>, ServiceError> {
    for key in record.keys() {
        if spec.column(key).is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Unknown column {}.{}",
                spec.name, key
            )));
        }
    }

    let mut values = Vec::new();
    for column in spec.columns {
        match record.get(column.name) {
            Some(value) => values.push((column.name, coerce_value(spec.name, column, value)?)),
            None if partial => {}
            None if column.required => {
                return Err(ServiceError::ValidationError(format!(
                    "Missing required column {}.{}",
                    spec.name, column.name
                )));
            }
            None => {}
        }
    }
    Ok(values)
}

#[derive(Clone)]
pub struct MasterDataService {
    db: Arc<DbPool>,
}

impl MasterDataService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    fn spec(&self, table: &str) -> Result<&'static TableSpec, ServiceError> {
        table_spec(table)
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown master-data table {}", table)))
    }

    fn row_to_json(
        spec: &TableSpec,
        row: &sea_orm::QueryResult,
    ) -> Result<JsonValue, ServiceError> {
        let mut object = JsonMap::new();
        for column in spec.columns {
            let value = match column.ty {
                FieldType::Text => row
                    .try_get::<Option<String>>("", column.name)
                    .map(|v| v.map(JsonValue::from).unwrap_or(JsonValue::Null)),
                FieldType::Integer => row
                    .try_get::<Option<i64>>("", column.name)
                    .map(|v| v.map(JsonValue::from).unwrap_or(JsonValue::Null)),
                FieldType::Decimal => row
                    .try_get::<Option<Decimal>>("", column.name)
                    .map(|v| v.map(|d| json!(d)).unwrap_or(JsonValue::Null)),
            }
            .map_err(|e| ServiceError::DatabaseError(e.into()))?;
            object.insert(column.name.to_string(), value);
        }
        Ok(JsonValue::Object(object))
    }

    /// All rows of one registry table as JSON objects.
    #[instrument(skip(self))]
    pub async fn list(&self, table: &str) -> Result<Vec<JsonValue>, ServiceError> {
        let spec = self.spec(table)?;

        let mut select = Query::select();
        select.from(Alias::new(spec.name));
        for column in spec.columns {
            select.column(Alias::new(column.name));
        }
        select.order_by(Alias::new(spec.primary_key), Order::Asc);

        let stmt = self.db.get_database_backend().build(&select);
        let rows = self
            .db
            .query_all(stmt)
            .await
            .map_err(ServiceError::db_error)?;

        rows.iter().map(|row| Self::row_to_json(spec, row)).collect()
    }

    /// Applies the table-specific derived-field rules before validation:
    /// pack sizes get their display string, uom multiplier and next id;
    /// items get their generated name.
    async fn apply_derivations(
        &self,
        spec: &TableSpec,
        record: &mut JsonMap<String, JsonValue>,
    ) -> Result<(), ServiceError> {
        match spec.name {
            "pack_size" => {
                let units = record
                    .get("units_per_each")
                    .and_then(decimal_from_json);
                let volume = record
                    .get("volume_per_unit")
                    .and_then(decimal_from_json);
                let uou = record
                    .get("units_of_units")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);
                let package = record
                    .get("package_type")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);

                if let (Some(units), Some(volume), Some(uou), Some(package)) =
                    (units, volume, uou.as_deref(), package.as_deref())
                {
                    record.insert(
                        "pack_size".into(),
                        JsonValue::from(generate_pack_size(units, volume, uou, package)),
                    );
                    record.insert(
                        "uom_per_each".into(),
                        json!(uom_per_each(units, volume)),
                    );
                }

                if !record.contains_key("id") {
                    let next_id = self.next_pack_size_id().await?;
                    record.insert("id".into(), JsonValue::from(next_id));
                }
            }
            "item" => {
                if !record.contains_key("item_name") {
                    let product = record.get("product_name").and_then(JsonValue::as_str);
                    let pack = record.get("pack_size").and_then(JsonValue::as_str);
                    if let (Some(product), Some(pack)) = (product, pack) {
                        record.insert(
                            "item_name".into(),
                            JsonValue::from(generate_item_name(product, pack)),
                        );
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn next_pack_size_id(&self) -> Result<i64, ServiceError> {
        let mut select = Query::select();
        select
            .from(Alias::new("pack_size"))
            .expr(Expr::col(Alias::new("id")).max());

        let stmt = self.db.get_database_backend().build(&select);
        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(ServiceError::db_error)?;

        let max: Option<i64> = match row {
            Some(row) => row.try_get_by_index(0).unwrap_or(None),
            None => None,
        };
        Ok(max.unwrap_or(0) + 1)
    }

    /// Inserts one record after derivation and validation.
    #[instrument(skip(self, record))]
    pub async fn insert(
        &self,
        table: &str,
        mut record: JsonMap<String, JsonValue>,
    ) -> Result<JsonValue, ServiceError> {
        let spec = self.spec(table)?;
        self.apply_derivations(spec, &mut record).await?;
        let values = validate_record(spec, &record, false)?;
        if values.is_empty() {
            return Err(ServiceError::ValidationError("Empty record".into()));
        }

        let mut insert = Query::insert();
        insert.into_table(Alias::new(spec.name));
        insert.columns(values.iter().map(|(name, _)| Alias::new(*name)));
        insert
            .values(values.iter().map(|(_, value)| Expr::val(value.clone()).into()))
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let stmt = self.db.get_database_backend().build(&insert);
        self.db
            .execute(stmt)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(JsonValue::Object(record))
    }

    /// Updates one record by primary key; only provided columns change.
    #[instrument(skip(self, record))]
    pub async fn update(
        &self,
        table: &str,
        key: &str,
        record: JsonMap<String, JsonValue>,
    ) -> Result<(), ServiceError> {
        let spec = self.spec(table)?;
        let values = validate_record(spec, &record, true)?;
        if values.is_empty() {
            return Err(ServiceError::ValidationError("Empty record".into()));
        }
        let key_value = self.coerce_key(spec, key)?;

        let mut update = Query::update();
        update.table(Alias::new(spec.name));
        for (name, value) in values {
            update.value(Alias::new(name), value);
        }
        update.and_where(Expr::col(Alias::new(spec.primary_key)).eq(key_value));

        let stmt = self.db.get_database_backend().build(&update);
        let result = self
            .db
            .execute(stmt)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!(
                "{} {} not found",
                spec.name, key
            )));
        }
        Ok(())
    }

    /// Deletes one record by primary key.
    #[instrument(skip(self))]
    pub async fn delete(&self, table: &str, key: &str) -> Result<(), ServiceError> {
        let spec = self.spec(table)?;
        let key_value = self.coerce_key(spec, key)?;

        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(spec.name))
            .and_where(Expr::col(Alias::new(spec.primary_key)).eq(key_value));

        let stmt = self.db.get_database_backend().build(&delete);
        let result = self
            .db
            .execute(stmt)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!(
                "{} {} not found",
                spec.name, key
            )));
        }
        Ok(())
    }

    fn coerce_key(&self, spec: &TableSpec, key: &str) -> Result<Value, ServiceError> {
        let column = spec.column(spec.primary_key).ok_or_else(|| {
            ServiceError::InternalError(format!("No primary key column on {}", spec.name))
        })?;
        coerce_value(spec.name, column, &JsonValue::from(key.to_string())).or_else(|_| {
            // Numeric keys arrive as path strings.
            key.parse::<i64>()
                .map(|n| Value::BigInt(Some(n)))
                .map_err(|_| {
                    ServiceError::ValidationError(format!("Invalid key for {}", spec.name))
                })
        })
    }

    /// Option lists for each foreign-key column of a table: the referenced
    /// column's values (pack sizes ordered by their numeric id).
    pub async fn foreign_key_options(
        &self,
        table: &str,
    ) -> Result<HashMap<String, Vec<JsonValue>>, ServiceError> {
        let spec = self.spec(table)?;
        let mut options = HashMap::new();

        for fk in spec.foreign_keys {
            let mut select = Query::select();
            select
                .from(Alias::new(fk.table))
                .column(Alias::new(fk.references));
            if fk.table == "pack_size" {
                select.order_by(Alias::new("id"), Order::Asc);
            } else {
                select.order_by(Alias::new(fk.references), Order::Asc);
            }

            let stmt = self.db.get_database_backend().build(&select);
            let rows = self
                .db
                .query_all(stmt)
                .await
                .map_err(ServiceError::db_error)?;

            let mut values = Vec::new();
            for row in rows {
                let value: Option<String> = row
                    .try_get("", fk.references)
                    .map_err(|e| ServiceError::DatabaseError(e.into()))?;
                values.push(value.map(JsonValue::from).unwrap_or(JsonValue::Null));
            }
            options.insert(fk.column.to_string(), values);
        }

        Ok(options)
    }
}

fn decimal_from_json(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        JsonValue::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn pack_size_string_for_multi_unit_cases() {
        assert_eq!(
            generate_pack_size(dec!(2), dec!(2.5), "Gal", "Case"),
            "2x2.5 gal/case"
        );
    }

    #[test]
    fn pack_size_string_collapses_single_units() {
        assert_eq!(
            generate_pack_size(dec!(1), dec!(30), "Gal", "Drum"),
            "30 gal/drum"
        );
    }

    #[test]
    fn item_name_concatenates_product_and_pack() {
        assert_eq!(
            generate_item_name("AquaShield", "2x2.5 gal/case"),
            "AquaShield 2x2.5 gal/case"
        );
    }

    #[test]
    fn uom_per_each_is_units_times_volume() {
        assert_eq!(uom_per_each(dec!(2), dec!(2.5)), dec!(5.0));
    }

    #[test]
    fn registry_knows_every_editable_table() {
        for name in [
            "product",
            "item",
            "pack_size",
            "warehouse",
            "case_type",
            "product_type",
            "registrant",
            "units_of_units",
        ] {
            assert!(table_spec(name).is_some(), "missing table {}", name);
        }
        assert!(table_spec("transaction_header").is_none());
        assert!(table_spec("app_user").is_none());
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let spec = table_spec("warehouse").unwrap();
        let mut record = JsonMap::new();
        record.insert("common_name".into(), "W1".into());
        record.insert("drop_table".into(), "x".into());
        let err = validate_record(spec, &record, false).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) => {
            assert!(msg.contains("drop_table"));
        });
    }

    #[test]
    fn missing_required_columns_are_rejected_on_insert() {
        let spec = table_spec("product").unwrap();
        let mut record = JsonMap::new();
        record.insert("product_name".into(), "AquaShield".into());
        let err = validate_record(spec, &record, false).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) => {
            assert!(msg.contains("registrant"));
        });
        // The same record is fine as a partial update.
        assert!(validate_record(spec, &record, true).is_ok());
    }

    #[test]
    fn type_mismatches_are_rejected() {
        let spec = table_spec("pack_size").unwrap();
        let mut record = JsonMap::new();
        record.insert("units_per_each".into(), "not-a-number".into());
        let err = validate_record(spec, &record, true).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }
}
