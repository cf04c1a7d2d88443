//! Unit tests for TransactionService against a mocked database: status
//! whitelisting, reference allocation, the transfer pair, and the
//! related-transaction delete guard.

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use std::sync::Arc;
use uuid::Uuid;
use wims_api::{
    entities::transaction_header,
    errors::ServiceError,
    events::{self, Event},
    models::{InventoryStatus, LineStatus, TransactionType},
    services::transactions::{
        NewTransaction, NewTransactionLine, NewTransferOrder, TransactionService,
    },
};

fn header(
    ttype: TransactionType,
    reference: &str,
    warehouse: &str,
    date: &str,
    related: Option<Uuid>,
) -> transaction_header::Model {
    transaction_header::Model {
        transaction_id: Uuid::new_v4(),
        transaction_type: ttype.as_str().to_string(),
        transaction_date: date.parse().unwrap(),
        warehouse: Some(warehouse.to_string()),
        reference_type: Some("Transfer Order".into()),
        reference_number: reference.to_string(),
        shipment_carrier: None,
        shipping_document: None,
        customer_po: None,
        customer_name: None,
        comments: None,
        related_transaction_id: related,
        created_by: None,
        last_edited_by: None,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn gizmo_lines() -> Vec<NewTransactionLine> {
    vec![NewTransactionLine {
        item_name: "Gizmo".into(),
        quantity: dec!(50),
        lot_number: None,
        comments: None,
    }]
}

fn service(db: DatabaseConnection) -> (TransactionService, tokio::sync::mpsc::Receiver<Event>) {
    let (event_sender, event_rx) = events::channel(16);
    (
        TransactionService::new(Arc::new(db), event_sender),
        event_rx,
    )
}

#[tokio::test]
async fn invalid_status_is_rejected_before_any_write() {
    // No mocked results: the validation failure must fire before the
    // database is touched.
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (service, _event_rx) = service(db);

    let err = service
        .create(
            NewTransaction {
                transaction_type: TransactionType::Inbound,
                transaction_date: "2024-02-01".parse().unwrap(),
                warehouse: Some("WH-A".into()),
                reference_type: None,
                status: LineStatus::Shipped,
                inventory_status: InventoryStatus::Stock,
                shipment_carrier: None,
                shipping_document: None,
                customer_po: None,
                customer_name: None,
                comments: None,
                related_transaction_id: None,
                lines: gizmo_lines(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::InvalidStatus(msg) => {
            assert!(msg.contains("Shipped"));
            assert!(msg.contains("Inbound"));
        }
        other => panic!("expected InvalidStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_line_lists_are_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (service, _event_rx) = service(db);

    let err = service
        .create(
            NewTransaction {
                transaction_type: TransactionType::Outbound,
                transaction_date: "2024-02-01".parse().unwrap(),
                warehouse: Some("WH-A".into()),
                reference_type: None,
                status: LineStatus::Pending,
                inventory_status: InventoryStatus::Stock,
                shipment_carrier: None,
                shipping_document: None,
                customer_po: None,
                customer_name: None,
                comments: None,
                related_transaction_id: None,
                lines: Vec::new(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn reference_numbers_continue_from_the_highest_existing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // Highest existing OB reference
        .append_query_results([vec![header(
            TransactionType::Outbound,
            "OB-100041",
            "WH-A",
            "2024-01-15",
            None,
        )]])
        .into_connection();
    let (service, _event_rx) = service(db);

    let reference = service
        .next_reference(TransactionType::Outbound)
        .await
        .unwrap();
    assert_eq!(reference, "OB-100042");
}

#[tokio::test]
async fn first_reference_of_a_prefix_starts_at_100001() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<transaction_header::Model>::new()])
        .into_connection();
    let (service, _event_rx) = service(db);

    let reference = service
        .next_reference(TransactionType::Adjustment)
        .await
        .unwrap();
    assert_eq!(reference, "ADJ-100001");
}

#[tokio::test]
async fn transfer_creates_linked_outbound_and_inbound_legs() {
    let outbound = header(
        TransactionType::Outbound,
        "OB-100001",
        "WH-A",
        "2024-02-01",
        None,
    );
    let inbound = header(
        TransactionType::Inbound,
        "IB-100001",
        "WH-B",
        "2024-02-05",
        Some(outbound.transaction_id),
    );

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // Outbound leg: reference lookup, header insert, detail insert
        .append_query_results([Vec::<transaction_header::Model>::new()])
        .append_query_results([vec![outbound.clone()]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        // Inbound leg: reference lookup, header insert, detail insert
        .append_query_results([Vec::<transaction_header::Model>::new()])
        .append_query_results([vec![inbound.clone()]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let (service, mut event_rx) = service(db);

    let (created_outbound, created_inbound) = service
        .create_transfer(
            NewTransferOrder {
                source_warehouse: "WH-A".into(),
                destination_warehouse: "WH-B".into(),
                transaction_date: "2024-02-01".parse::<NaiveDate>().unwrap(),
                outbound_status: LineStatus::Shipped,
                inventory_status: InventoryStatus::Stock,
                destination_inventory_status: None,
                lead_days: None,
                shipment_carrier: None,
                shipping_document: None,
                comments: None,
                lines: gizmo_lines(),
            },
            2,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(created_outbound.transaction_type, "Outbound");
    assert_eq!(created_inbound.transaction_type, "Inbound");
    assert_eq!(
        created_inbound.related_transaction_id,
        Some(created_outbound.transaction_id)
    );
    // 2024-02-01 is a Thursday; two business days later is Monday the 5th.
    assert_eq!(
        created_inbound.transaction_date,
        "2024-02-05".parse::<NaiveDate>().unwrap()
    );

    let mut saw_transfer = false;
    while let Ok(event) = event_rx.try_recv() {
        if let Event::TransferCreated {
            outbound_id,
            inbound_id,
        } = event
        {
            assert_eq!(outbound_id, created_outbound.transaction_id);
            assert_eq!(inbound_id, created_inbound.transaction_id);
            saw_transfer = true;
        }
    }
    assert!(saw_transfer, "expected a TransferCreated event");
}

#[tokio::test]
async fn transfer_to_the_same_warehouse_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (service, _event_rx) = service(db);

    let err = service
        .create_transfer(
            NewTransferOrder {
                source_warehouse: "WH-A".into(),
                destination_warehouse: "WH-A".into(),
                transaction_date: "2024-02-01".parse().unwrap(),
                outbound_status: LineStatus::Shipped,
                inventory_status: InventoryStatus::Stock,
                destination_inventory_status: None,
                lead_days: None,
                shipment_carrier: None,
                shipping_document: None,
                comments: None,
                lines: gizmo_lines(),
            },
            2,
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn deleting_a_referenced_outbound_is_refused_with_the_blocking_reference() {
    let outbound = header(
        TransactionType::Outbound,
        "OB-100001",
        "WH-A",
        "2024-02-01",
        None,
    );
    let inbound = header(
        TransactionType::Inbound,
        "IB-100001",
        "WH-B",
        "2024-02-05",
        Some(outbound.transaction_id),
    );

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // Header fetch
        .append_query_results([vec![outbound.clone()]])
        // Related transactions still pointing at it
        .append_query_results([vec![inbound]])
        .into_connection();
    let (service, _event_rx) = service(db);

    let err = service
        .delete_header(outbound.transaction_id)
        .await
        .unwrap_err();
    match err {
        ServiceError::Conflict(msg) => {
            assert!(msg.contains("IB-100001"), "message was: {}", msg);
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn deleting_an_unreferenced_header_cascades_details_first() {
    let outbound = header(
        TransactionType::Outbound,
        "OB-100002",
        "WH-A",
        "2024-02-01",
        None,
    );

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![outbound.clone()]])
        // No related transactions
        .append_query_results([Vec::<transaction_header::Model>::new()])
        // Detail delete, then header delete
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();
    let (service, mut event_rx) = service(db);

    service.delete_header(outbound.transaction_id).await.unwrap();

    let mut saw_delete = false;
    while let Ok(event) = event_rx.try_recv() {
        if let Event::TransactionDeleted {
            reference_number, ..
        } = event
        {
            assert_eq!(reference_number, "OB-100002");
            saw_delete = true;
        }
    }
    assert!(saw_delete, "expected a TransactionDeleted event");
}
