use crate::{
    db::DbPool,
    entities::{
        inventory_snapshot::{self, Entity as InventorySnapshotRow},
        item::{self, Entity as Item},
        transaction_detail,
        transaction_header::{self, Entity as TransactionHeader},
        warehouse::{self, Entity as Warehouse},
    },
    errors::ServiceError,
    models::{InventoryStatus, LineStatus, OnHand, TransactionType},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

/// Latest on-hand breakdown per item for one warehouse as of a date.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventorySnapshot {
    pub warehouse: String,
    pub as_of: NaiveDate,
    pub lines: Vec<SnapshotLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotLine {
    pub item_name: String,
    pub on_hand: OnHand,
    /// Volume per case; None when the item has no usable pack size, in
    /// which case case-count conversion must not be attempted.
    pub uom_per_each: Option<Decimal>,
}

impl InventorySnapshot {
    /// System-calculated count for an item+status; zero when the item is
    /// absent from the snapshot.
    pub fn on_hand_for(&self, item_name: &str, status: InventoryStatus) -> Decimal {
        self.lines
            .iter()
            .find(|line| line.item_name == item_name)
            .map(|line| line.on_hand.get(status))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn uom_for(&self, item_name: &str) -> Option<Decimal> {
        self.lines
            .iter()
            .find(|line| line.item_name == item_name)
            .and_then(|line| line.uom_per_each)
    }
}

/// One detail line's contribution to the on-hand ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub item_name: String,
    pub warehouse: String,
    pub transaction_date: NaiveDate,
    pub transaction_type: TransactionType,
    pub line_status: LineStatus,
    pub inventory_status: InventoryStatus,
    pub quantity: Decimal,
}

/// Folded position for one (item, warehouse, status).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub on_hand: Decimal,
    /// Pending outbound quantity.
    pub committed: Decimal,
    /// Pending inbound quantity.
    pub on_order: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OnHandRow {
    pub item_name: String,
    pub warehouse: String,
    pub inventory_status: InventoryStatus,
    pub on_hand: Decimal,
    pub committed: Decimal,
    pub on_order: Decimal,
}

/// Folds movements in chronological order (Inbound before Outbound on the
/// same date) into per-(item, warehouse, status) positions. Received adds
/// to on-hand, Shipped subtracts, Completed adjustments apply their signed
/// quantity; Pending lines accrue to on-order (inbound) or committed
/// (outbound) only.
pub fn fold_movements(
    mut movements: Vec<Movement>,
) -> HashMap<(String, String, InventoryStatus), Position> {
    fn type_rank(ttype: TransactionType) -> u8 {
        match ttype {
            TransactionType::Inbound => 0,
            TransactionType::Adjustment => 1,
            TransactionType::Outbound => 2,
        }
    }

    movements.sort_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then(type_rank(a.transaction_type).cmp(&type_rank(b.transaction_type)))
    });

    let mut positions: HashMap<(String, String, InventoryStatus), Position> = HashMap::new();
    for movement in movements {
        let key = (
            movement.item_name.clone(),
            movement.warehouse.clone(),
            movement.inventory_status,
        );
        let position = positions.entry(key).or_default();
        match (movement.transaction_type, movement.line_status) {
            (TransactionType::Inbound, LineStatus::Received) => {
                position.on_hand += movement.quantity
            }
            (TransactionType::Inbound, LineStatus::Pending) => {
                position.on_order += movement.quantity
            }
            (TransactionType::Outbound, LineStatus::Shipped) => {
                position.on_hand -= movement.quantity
            }
            (TransactionType::Outbound, LineStatus::Pending) => {
                position.committed += movement.quantity
            }
            (TransactionType::Adjustment, LineStatus::Completed) => {
                position.on_hand += movement.quantity
            }
            _ => {}
        }
    }
    positions
}

#[derive(Debug, Clone, Default)]
pub struct OnHandFilters {
    pub status: Option<InventoryStatus>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// All warehouses, optionally narrowed by a case-insensitive substring
    /// match on the common name.
    pub async fn list_warehouses(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<warehouse::Model>, ServiceError> {
        let mut warehouses = Warehouse::find()
            .order_by_asc(warehouse::Column::CommonName)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if let Some(needle) = search.map(str::to_lowercase).filter(|s| !s.is_empty()) {
            warehouses.retain(|w| w.common_name.to_lowercase().contains(&needle));
        }

        Ok(warehouses)
    }

    /// Latest on-hand breakdown per item for `warehouse` as of end-of-day
    /// `as_of`, from the precomputed snapshot view. Items whose three
    /// status totals are all zero are dropped. Any read error aborts the
    /// whole computation.
    #[instrument(skip(self))]
    pub async fn snapshot(
        &self,
        warehouse: &str,
        as_of: NaiveDate,
    ) -> Result<InventorySnapshot, ServiceError> {
        let rows = InventorySnapshotRow::find()
            .filter(inventory_snapshot::Column::Warehouse.eq(warehouse))
            .filter(inventory_snapshot::Column::TransactionDate.lte(as_of))
            .order_by_asc(inventory_snapshot::Column::ItemName)
            .order_by_desc(inventory_snapshot::Column::TransactionDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| {
                error!("Snapshot read failed for {}: {}", warehouse, e);
                ServiceError::InventoryError("Failed to fetch inventory".into())
            })?;

        // Rows arrive newest-first per item; the first row per item is the
        // latest record at or before the as-of date.
        let mut latest: Vec<inventory_snapshot::Model> = Vec::new();
        for row in rows {
            match latest.last() {
                Some(prev) if prev.item_name == row.item_name => {}
                _ => latest.push(row),
            }
        }

        let uom_map = self.uom_map().await?;

        let lines = latest
            .into_iter()
            .map(|row| SnapshotLine {
                uom_per_each: uom_map.get(&row.item_name).copied().flatten(),
                on_hand: OnHand {
                    stock: row.on_hand_stock,
                    consignment: row.on_hand_consignment,
                    hold: row.on_hand_hold,
                },
                item_name: row.item_name,
            })
            .filter(|line| !line.on_hand.is_zero())
            .collect();

        Ok(InventorySnapshot {
            warehouse: warehouse.to_string(),
            as_of,
            lines,
        })
    }

    /// Per-item volume-per-case multipliers (null when the pack size does
    /// not carry one).
    pub async fn uom_map(&self) -> Result<HashMap<String, Option<Decimal>>, ServiceError> {
        let items = Item::find()
            .find_also_related(crate::entities::pack_size::Entity)
            .all(self.db.as_ref())
            .await
            .map_err(|e| {
                error!("Item/pack size read failed: {}", e);
                ServiceError::InventoryError("Failed to fetch inventory".into())
            })?;

        Ok(items
            .into_iter()
            .map(|(item, pack)| (item.item_name, pack.and_then(|p| p.uom_per_each)))
            .collect())
    }

    /// Looks up one item with its multiplier, for adding uncounted items to
    /// a physical count.
    pub async fn find_item(
        &self,
        item_name: &str,
    ) -> Result<Option<(item::Model, Option<Decimal>)>, ServiceError> {
        let found = Item::find_by_id(item_name)
            .find_also_related(crate::entities::pack_size::Entity)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(found.map(|(item, pack)| (item, pack.and_then(|p| p.uom_per_each))))
    }

    /// Current positions computed by folding the full transaction history.
    #[instrument(skip(self))]
    pub async fn on_hand(&self, filters: OnHandFilters) -> Result<Vec<OnHandRow>, ServiceError> {
        let rows = TransactionHeader::find()
            .find_with_related(transaction_detail::Entity)
            .all(self.db.as_ref())
            .await
            .map_err(|e| {
                error!("Transaction history read failed: {}", e);
                ServiceError::InventoryError("Failed to fetch inventory".into())
            })?;

        let mut movements = Vec::new();
        for (header, details) in rows {
            let Some(warehouse) = header.warehouse.clone() else {
                continue;
            };
            let Ok(ttype) = TransactionType::from_str(&header.transaction_type) else {
                continue;
            };
            for detail in details {
                let Ok(line_status) = LineStatus::from_str(&detail.status) else {
                    continue;
                };
                // Lines without a usable inventory status count as Stock.
                let inventory_status = InventoryStatus::from_str(&detail.inventory_status)
                    .unwrap_or(InventoryStatus::Stock);
                movements.push(Movement {
                    item_name: detail.item_name,
                    warehouse: warehouse.clone(),
                    transaction_date: header.transaction_date,
                    transaction_type: ttype,
                    line_status,
                    inventory_status,
                    quantity: detail.quantity,
                });
            }
        }

        let positions = fold_movements(movements);

        let mut result: Vec<OnHandRow> = positions
            .into_iter()
            .map(|((item_name, warehouse, status), position)| OnHandRow {
                item_name,
                warehouse,
                inventory_status: status,
                on_hand: position.on_hand,
                committed: position.committed,
                on_order: position.on_order,
            })
            .collect();

        if let Some(status) = filters.status {
            result.retain(|row| row.inventory_status == status);
        }
        if let Some(needle) = filters
            .search
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
        {
            result.retain(|row| {
                row.item_name.to_lowercase().contains(&needle)
                    || row.warehouse.to_lowercase().contains(&needle)
            });
        }

        result.sort_by(|a, b| {
            (&a.item_name, &a.warehouse, a.inventory_status.as_str()).cmp(&(
                &b.item_name,
                &b.warehouse,
                b.inventory_status.as_str(),
            ))
        });

        Ok(result)
    }

    /// Still-Pending detail lines for a warehouse at or before a date,
    /// surfaced informationally during variance review.
    pub async fn pending_lines(
        &self,
        warehouse: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<(transaction_header::Model, Vec<transaction_detail::Model>)>, ServiceError>
    {
        let rows = TransactionHeader::find()
            .filter(transaction_header::Column::Warehouse.eq(warehouse))
            .filter(transaction_header::Column::TransactionDate.lte(as_of))
            .order_by_asc(transaction_header::Column::TransactionDate)
            .find_with_related(transaction_detail::Entity)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(header, details)| {
                let pending: Vec<_> = details
                    .into_iter()
                    .filter(|d| d.status == LineStatus::Pending.as_str())
                    .collect();
                if pending.is_empty() {
                    None
                } else {
                    Some((header, pending))
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn movement(
        date: &str,
        ttype: TransactionType,
        status: LineStatus,
        quantity: Decimal,
    ) -> Movement {
        Movement {
            item_name: "Widget".into(),
            warehouse: "W1".into(),
            transaction_date: date.parse().unwrap(),
            transaction_type: ttype,
            line_status: status,
            inventory_status: InventoryStatus::Stock,
            quantity,
        }
    }

    #[test]
    fn received_adds_and_shipped_subtracts() {
        let positions = fold_movements(vec![
            movement("2024-01-01", TransactionType::Inbound, LineStatus::Received, dec!(100)),
            movement("2024-01-05", TransactionType::Outbound, LineStatus::Shipped, dec!(30)),
        ]);
        let position = &positions[&("Widget".into(), "W1".into(), InventoryStatus::Stock)];
        assert_eq!(position.on_hand, dec!(70));
        assert_eq!(position.committed, dec!(0));
        assert_eq!(position.on_order, dec!(0));
    }

    #[test]
    fn pending_lines_never_touch_on_hand() {
        let positions = fold_movements(vec![
            movement("2024-01-01", TransactionType::Inbound, LineStatus::Received, dec!(10)),
            movement("2024-01-02", TransactionType::Inbound, LineStatus::Pending, dec!(5)),
            movement("2024-01-03", TransactionType::Outbound, LineStatus::Pending, dec!(3)),
        ]);
        let position = &positions[&("Widget".into(), "W1".into(), InventoryStatus::Stock)];
        assert_eq!(position.on_hand, dec!(10));
        assert_eq!(position.on_order, dec!(5));
        assert_eq!(position.committed, dec!(3));
    }

    #[test]
    fn completed_adjustments_apply_signed_quantity() {
        let positions = fold_movements(vec![
            movement("2024-01-01", TransactionType::Inbound, LineStatus::Received, dec!(100)),
            movement("2024-01-15", TransactionType::Adjustment, LineStatus::Completed, dec!(-20)),
        ]);
        let position = &positions[&("Widget".into(), "W1".into(), InventoryStatus::Stock)];
        assert_eq!(position.on_hand, dec!(80));
    }

    #[test]
    fn statuses_are_tracked_independently() {
        let mut consign =
            movement("2024-01-01", TransactionType::Inbound, LineStatus::Received, dec!(4));
        consign.inventory_status = InventoryStatus::Consignment;
        let positions = fold_movements(vec![
            movement("2024-01-01", TransactionType::Inbound, LineStatus::Received, dec!(6)),
            consign,
        ]);
        assert_eq!(
            positions[&("Widget".into(), "W1".into(), InventoryStatus::Stock)].on_hand,
            dec!(6)
        );
        assert_eq!(
            positions[&("Widget".into(), "W1".into(), InventoryStatus::Consignment)].on_hand,
            dec!(4)
        );
    }

    #[test]
    fn snapshot_lookup_defaults_to_zero() {
        let snapshot = InventorySnapshot {
            warehouse: "W1".into(),
            as_of: "2024-01-15".parse().unwrap(),
            lines: vec![SnapshotLine {
                item_name: "Widget".into(),
                on_hand: OnHand {
                    stock: dec!(100),
                    consignment: dec!(0),
                    hold: dec!(0),
                },
                uom_per_each: Some(dec!(5)),
            }],
        };
        assert_eq!(
            snapshot.on_hand_for("Widget", InventoryStatus::Stock),
            dec!(100)
        );
        assert_eq!(
            snapshot.on_hand_for("Widget", InventoryStatus::Hold),
            dec!(0)
        );
        assert_eq!(
            snapshot.on_hand_for("Gizmo", InventoryStatus::Stock),
            dec!(0)
        );
        assert_eq!(snapshot.uom_for("Widget"), Some(dec!(5)));
        assert_eq!(snapshot.uom_for("Gizmo"), None);
    }
}
