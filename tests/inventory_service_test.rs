//! Snapshot reader tests against a mocked database: latest-at-or-before
//! selection, all-zero filtering, uom attachment, and the all-or-nothing
//! failure contract.

use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, RuntimeErr};
use std::sync::Arc;
use wims_api::{
    entities::{inventory_snapshot, item, pack_size},
    errors::ServiceError,
    models::InventoryStatus,
    services::inventory::InventoryService,
};

fn snapshot_row(
    item_name: &str,
    date: &str,
    stock: rust_decimal::Decimal,
    consignment: rust_decimal::Decimal,
    hold: rust_decimal::Decimal,
) -> inventory_snapshot::Model {
    inventory_snapshot::Model {
        item_name: item_name.to_string(),
        warehouse: "W1".to_string(),
        transaction_date: date.parse().unwrap(),
        on_hand_stock: stock,
        on_hand_consignment: consignment,
        on_hand_hold: hold,
        on_hand_total: stock + consignment + hold,
    }
}

fn item_with_uom(name: &str, uom: Option<rust_decimal::Decimal>) -> (item::Model, pack_size::Model) {
    (
        item::Model {
            item_name: name.to_string(),
            product_name: "Product".into(),
            pack_size: "1x5 gal/pail".into(),
        },
        pack_size::Model {
            pack_size: "1x5 gal/pail".into(),
            id: 1,
            units_per_each: dec!(1),
            volume_per_unit: dec!(5),
            units_of_units: "Gal".into(),
            package_type: "Pail".into(),
            uom_per_each: uom,
            eaches_per_pallet: None,
            pallets_per_tl: None,
            eaches_per_tl: None,
        },
    )
}

#[tokio::test]
async fn latest_record_per_item_wins_and_zero_items_are_dropped() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            // Rows arrive item-asc, date-desc: first per item is latest.
            snapshot_row("Gadget", "2024-01-12", dec!(0), dec!(0), dec!(0)),
            snapshot_row("Gadget", "2024-01-05", dec!(3), dec!(0), dec!(0)),
            snapshot_row("Widget", "2024-01-10", dec!(100), dec!(0), dec!(25)),
            snapshot_row("Widget", "2024-01-02", dec!(40), dec!(0), dec!(0)),
        ]])
        .append_query_results([vec![
            item_with_uom("Widget", Some(dec!(5))),
            item_with_uom("Gadget", None),
        ]])
        .into_connection();

    let service = InventoryService::new(Arc::new(db));
    let snapshot = service
        .snapshot("W1", "2024-01-15".parse().unwrap())
        .await
        .unwrap();

    // Gadget's latest record is all-zero, so only Widget survives.
    assert_eq!(snapshot.lines.len(), 1);
    let line = &snapshot.lines[0];
    assert_eq!(line.item_name, "Widget");
    assert_eq!(line.on_hand.stock, dec!(100));
    assert_eq!(line.on_hand.hold, dec!(25));
    assert_eq!(line.uom_per_each, Some(dec!(5)));

    assert_eq!(
        snapshot.on_hand_for("Widget", InventoryStatus::Stock),
        dec!(100)
    );
    assert_eq!(
        snapshot.on_hand_for("Gadget", InventoryStatus::Stock),
        dec!(0)
    );
}

#[tokio::test]
async fn read_errors_abort_with_a_generic_inventory_failure() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Query(RuntimeErr::Internal(
            "connection reset".into(),
        ))])
        .into_connection();

    let service = InventoryService::new(Arc::new(db));
    let err = service
        .snapshot("W1", "2024-01-15".parse().unwrap())
        .await
        .unwrap_err();

    match err {
        ServiceError::InventoryError(msg) => {
            // No partial results and no leaked cause.
            assert_eq!(msg, "Failed to fetch inventory");
        }
        other => panic!("expected InventoryError, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_uom_multipliers_surface_as_none() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![snapshot_row(
            "Gadget",
            "2024-01-12",
            dec!(3),
            dec!(0),
            dec!(0),
        )]])
        .append_query_results([vec![item_with_uom("Gadget", None)]])
        .into_connection();

    let service = InventoryService::new(Arc::new(db));
    let snapshot = service
        .snapshot("W1", "2024-01-15".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].uom_per_each, None);
    assert_eq!(snapshot.uom_for("Gadget"), None);
}
