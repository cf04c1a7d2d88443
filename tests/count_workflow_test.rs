//! End-to-end test of the count reconciliation workflow against a mocked
//! database: warehouse → date → count → variance → adjustment.
//!
//! Scenario: warehouse "W1", date 2024-01-15, snapshot shows Widget
//! On-Hand:Stock = 100; the physical count finds 80. The expected variance
//! is -20 and the generated adjustment carries one Completed "Count
//! shortage" line of -20.

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use std::sync::Arc;
use uuid::Uuid;
use wims_api::{
    entities::{inventory_snapshot, item, pack_size, transaction_header, warehouse},
    errors::ServiceError,
    events,
    models::InventoryStatus,
    services::{
        counts::{CountLineUpdate, CountService, CountStep},
        inventory::InventoryService,
        transactions::TransactionService,
    },
};

fn test_warehouse(name: &str) -> warehouse::Model {
    warehouse::Model {
        common_name: name.to_string(),
        location_id: None,
        establishment_name: None,
        epa: None,
        abbreviation: None,
        street: None,
        city: None,
        state: None,
        zip: None,
        phone: None,
        contact_name: None,
        location_hours: None,
    }
}

fn snapshot_row(
    item_name: &str,
    warehouse: &str,
    date: &str,
    stock: rust_decimal::Decimal,
) -> inventory_snapshot::Model {
    inventory_snapshot::Model {
        item_name: item_name.to_string(),
        warehouse: warehouse.to_string(),
        transaction_date: date.parse().unwrap(),
        on_hand_stock: stock,
        on_hand_consignment: dec!(0),
        on_hand_hold: dec!(0),
        on_hand_total: stock,
    }
}

fn widget_item() -> (item::Model, pack_size::Model) {
    (
        item::Model {
            item_name: "Widget".into(),
            product_name: "Widget Base".into(),
            pack_size: "2x2.5 gal/case".into(),
        },
        pack_size::Model {
            pack_size: "2x2.5 gal/case".into(),
            id: 1,
            units_per_each: dec!(2),
            volume_per_unit: dec!(2.5),
            units_of_units: "Gal".into(),
            package_type: "Case".into(),
            uom_per_each: Some(dec!(5)),
            eaches_per_pallet: None,
            pallets_per_tl: None,
            eaches_per_tl: None,
        },
    )
}

fn adjustment_header(reference: &str) -> transaction_header::Model {
    transaction_header::Model {
        transaction_id: Uuid::new_v4(),
        transaction_type: "Adjustment".into(),
        transaction_date: "2024-01-15".parse().unwrap(),
        warehouse: Some("W1".into()),
        reference_type: Some("Inventory Count".into()),
        reference_number: reference.to_string(),
        shipment_carrier: None,
        shipping_document: None,
        customer_po: None,
        customer_name: None,
        comments: None,
        related_transaction_id: None,
        created_by: None,
        last_edited_by: None,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn build_service(db: DatabaseConnection) -> (CountService, tokio::sync::mpsc::Receiver<events::Event>) {
    let db = Arc::new(db);
    let (event_sender, event_rx) = events::channel(16);
    let inventory = InventoryService::new(db.clone());
    let transactions = Arc::new(TransactionService::new(db.clone(), event_sender.clone()));
    (
        CountService::new(db, inventory, transactions, event_sender),
        event_rx,
    )
}

#[tokio::test]
async fn full_count_reconciliation_flow() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // select_warehouse: warehouse lookup
        .append_query_results([vec![test_warehouse("W1")]])
        // select_date: snapshot view rows (newest first per item)
        .append_query_results([vec![
            snapshot_row("Widget", "W1", "2024-01-10", dec!(100)),
            snapshot_row("Widget", "W1", "2024-01-02", dec!(40)),
        ]])
        // select_date: item ⋈ pack_size for the uom map
        .append_query_results([vec![widget_item()]])
        // review_variances: pending lines (none)
        .append_query_results([Vec::<(transaction_header::Model, wims_api::entities::transaction_detail::Model)>::new()])
        // generate_adjustment: highest existing ADJ reference (none yet)
        .append_query_results([Vec::<transaction_header::Model>::new()])
        // generate_adjustment: header insert returning
        .append_query_results([vec![adjustment_header("ADJ-100001")]])
        // generate_adjustment: detail insert
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();

    let (service, mut event_rx) = build_service(db);
    let actor = Uuid::new_v4();

    let workflow = service.start();
    assert_eq!(workflow.step, CountStep::Warehouse);

    let workflow = service.select_warehouse(workflow.id, "W1").await.unwrap();
    assert_eq!(workflow.step, CountStep::Date);

    // The latest snapshot row at or before the date wins, and lines are
    // pre-populated at quantity zero.
    let workflow = service
        .select_date(workflow.id, "2024-01-15".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(workflow.step, CountStep::Count);
    assert_eq!(workflow.lines.len(), 1);
    assert_eq!(workflow.lines[0].item_name, "Widget");
    assert_eq!(workflow.lines[0].quantity, dec!(0));
    assert_eq!(workflow.lines[0].uom_per_each, Some(dec!(5)));

    // Physical count: 80 units. Case count derives from the multiplier.
    let workflow = service
        .update_line(
            workflow.id,
            "Widget",
            InventoryStatus::Stock,
            CountLineUpdate {
                quantity: Some(dec!(80)),
                case_count: None,
                notes: None,
            },
        )
        .unwrap();
    assert_eq!(workflow.lines[0].case_count, dec!(16));

    let workflow = service.review_variances(workflow.id).await.unwrap();
    assert_eq!(workflow.step, CountStep::Variance);
    assert_eq!(workflow.variances.len(), 1);
    let variance = &workflow.variances[0];
    assert_eq!(variance.item_name, "Widget");
    assert_eq!(variance.inventory_status, InventoryStatus::Stock);
    assert_eq!(variance.physical_count, dec!(80));
    assert_eq!(variance.calculated_count, dec!(100));
    assert_eq!(variance.variance, dec!(-20));

    let transaction_id = service
        .generate_adjustment(workflow.id, actor)
        .await
        .unwrap();

    let workflow = service.get(workflow.id).unwrap();
    assert_eq!(workflow.step, CountStep::Adjustment);
    assert_eq!(workflow.adjustment_id, Some(transaction_id));

    // The adjustment event carries exactly one (nonzero) detail line.
    let mut saw_adjustment = false;
    while let Ok(event) = event_rx.try_recv() {
        if let events::Event::AdjustmentGenerated {
            reference_number,
            line_count,
            ..
        } = event
        {
            assert_eq!(reference_number, "ADJ-100001");
            assert_eq!(line_count, 1);
            saw_adjustment = true;
        }
    }
    assert!(saw_adjustment, "expected an AdjustmentGenerated event");
}

#[tokio::test]
async fn future_count_dates_are_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![test_warehouse("W1")]])
        .into_connection();
    let (service, _event_rx) = build_service(db);

    let workflow = service.start();
    let workflow = service.select_warehouse(workflow.id, "W1").await.unwrap();

    let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
    let err = service.select_date(workflow.id, tomorrow).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn variance_review_requires_at_least_one_line() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![test_warehouse("Empty Warehouse")]])
        // Snapshot has nothing on hand, so no lines are pre-populated.
        .append_query_results([Vec::<inventory_snapshot::Model>::new()])
        .append_query_results([vec![widget_item()]])
        .into_connection();
    let (service, _event_rx) = build_service(db);

    let workflow = service.start();
    let workflow = service
        .select_warehouse(workflow.id, "Empty Warehouse")
        .await
        .unwrap();
    let workflow = service
        .select_date(workflow.id, "2024-01-15".parse().unwrap())
        .await
        .unwrap();
    assert!(workflow.lines.is_empty());

    let err = service.review_variances(workflow.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_warehouses_are_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![test_warehouse("W1")]])
        .into_connection();
    let (service, _event_rx) = build_service(db);

    let workflow = service.start();
    let err = service
        .select_warehouse(workflow.id, "Nowhere")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn back_navigation_is_linear() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![test_warehouse("W1")]])
        .into_connection();
    let (service, _event_rx) = build_service(db);

    let workflow = service.start();
    let workflow = service.select_warehouse(workflow.id, "W1").await.unwrap();
    assert_eq!(workflow.step, CountStep::Date);

    let workflow = service.back(workflow.id).unwrap();
    assert_eq!(workflow.step, CountStep::Warehouse);

    let err = service.back(workflow.id).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}
