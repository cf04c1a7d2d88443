use crate::{
    db::DbPool,
    entities::{
        transaction_detail::{self, Entity as TransactionDetail},
        transaction_full::{self, Entity as TransactionFull},
        transaction_header::{self, Entity as TransactionHeader},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{add_business_days, next_reference, InventoryStatus, LineStatus, TransactionType},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// One line of a transaction being created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTransactionLine {
    pub item_name: String,
    pub quantity: Decimal,
    pub lot_number: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub warehouse: Option<String>,
    pub reference_type: Option<String>,
    /// Applied to every line; must belong to the type's allowed subset.
    pub status: LineStatus,
    pub inventory_status: InventoryStatus,
    pub shipment_carrier: Option<String>,
    pub shipping_document: Option<String>,
    pub customer_po: Option<String>,
    pub customer_name: Option<String>,
    pub comments: Option<String>,
    pub related_transaction_id: Option<Uuid>,
    pub lines: Vec<NewTransactionLine>,
}

/// A transfer order: an Outbound leg at the source warehouse and a linked
/// Inbound leg at the destination.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTransferOrder {
    pub source_warehouse: String,
    pub destination_warehouse: String,
    pub transaction_date: NaiveDate,
    pub outbound_status: LineStatus,
    pub inventory_status: InventoryStatus,
    /// Inventory status at the destination; defaults to the source status.
    pub destination_inventory_status: Option<InventoryStatus>,
    /// Business days between the legs; defaults to the configured lead time.
    pub lead_days: Option<u32>,
    pub shipment_carrier: Option<String>,
    pub shipping_document: Option<String>,
    pub comments: Option<String>,
    pub lines: Vec<NewTransactionLine>,
}

/// Fixed header field set exposed for edits; absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTransactionHeader {
    pub transaction_date: Option<NaiveDate>,
    pub warehouse: Option<String>,
    pub shipment_carrier: Option<String>,
    pub shipping_document: Option<String>,
    pub customer_po: Option<String>,
    pub customer_name: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTransactionDetail {
    pub quantity: Option<Decimal>,
    pub inventory_status: Option<InventoryStatus>,
    pub status: Option<LineStatus>,
    pub lot_number: Option<String>,
    pub comments: Option<String>,
}

/// Display-oriented transaction with its lines, grouped from the flattened
/// view rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionView {
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub reference_type: Option<String>,
    pub reference_number: String,
    pub warehouse: Option<String>,
    pub shipment_carrier: Option<String>,
    pub shipping_document: Option<String>,
    pub customer_po: Option<String>,
    pub customer_name: Option<String>,
    pub comments: Option<String>,
    pub related_transaction_id: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub last_edited_by_name: Option<String>,
    pub details: Vec<TransactionDetailView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionDetailView {
    pub detail_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    pub inventory_status: String,
    pub status: String,
    pub lot_number: Option<String>,
    pub comments: Option<String>,
}

/// Groups flattened view rows (one per detail) into transactions,
/// preserving the row order of first appearance.
pub fn group_view_rows(rows: Vec<transaction_full::Model>) -> Vec<TransactionView> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, TransactionView> = HashMap::new();

    for row in rows {
        let entry = grouped.entry(row.transaction_id).or_insert_with(|| {
            order.push(row.transaction_id);
            TransactionView {
                transaction_id: row.transaction_id,
                transaction_type: row.transaction_type.clone(),
                transaction_date: row.transaction_date,
                reference_type: row.reference_type.clone(),
                reference_number: row.reference_number.clone(),
                warehouse: row.warehouse.clone(),
                shipment_carrier: row.shipment_carrier.clone(),
                shipping_document: row.shipping_document.clone(),
                customer_po: row.customer_po.clone(),
                customer_name: row.customer_name.clone(),
                comments: row.header_comments.clone(),
                related_transaction_id: row.related_transaction_id,
                created_by_name: row.created_by_name.clone(),
                last_edited_by_name: row.last_edited_by_name.clone(),
                details: Vec::new(),
            }
        });
        entry.details.push(TransactionDetailView {
            detail_id: row.detail_id,
            item_name: row.item_name,
            quantity: row.quantity,
            inventory_status: row.inventory_status,
            status: row.detail_status,
            lot_number: row.lot_number,
            comments: row.detail_comments,
        });
    }

    order
        .into_iter()
        .filter_map(|id| grouped.remove(&id))
        .collect()
}

fn check_status(ttype: TransactionType, status: LineStatus) -> Result<(), ServiceError> {
    if ttype.permits(status) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Status \"{}\" not allowed for {} transaction",
            status, ttype
        )))
    }
}

#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl TransactionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Allocates the next reference number for a type by reading the
    /// highest existing reference for its prefix (reverse lexicographic on
    /// the text column). Read-then-write: the unique index on
    /// reference_number backstops concurrent allocation.
    pub async fn next_reference(&self, ttype: TransactionType) -> Result<String, ServiceError> {
        let prefix = ttype.reference_prefix();
        let last = TransactionHeader::find()
            .filter(transaction_header::Column::ReferenceNumber.like(format!("{}%", prefix)))
            .order_by_desc(transaction_header::Column::ReferenceNumber)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(next_reference(prefix, last.as_ref().map(|h| h.reference_number.as_str())))
    }

    /// Creates a transaction header and its detail lines. The two inserts
    /// are sequential; a detail failure after the header insert leaves the
    /// header in place (see DESIGN.md).
    #[instrument(skip(self, new))]
    pub async fn create(
        &self,
        new: NewTransaction,
        actor: Uuid,
    ) -> Result<transaction_header::Model, ServiceError> {
        check_status(new.transaction_type, new.status)?;
        if new.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one item line is required".into(),
            ));
        }
        if matches!(
            new.transaction_type,
            TransactionType::Inbound | TransactionType::Outbound
        ) && new.warehouse.as_deref().map_or(true, str::is_empty)
        {
            return Err(ServiceError::ValidationError(format!(
                "Warehouse is required for {} transactions",
                new.transaction_type
            )));
        }

        let reference_number = self.next_reference(new.transaction_type).await?;
        let transaction_id = Uuid::new_v4();
        let now = Utc::now();

        let header = transaction_header::ActiveModel {
            transaction_id: Set(transaction_id),
            transaction_type: Set(new.transaction_type.as_str().to_string()),
            transaction_date: Set(new.transaction_date),
            warehouse: Set(new.warehouse),
            reference_type: Set(new.reference_type),
            reference_number: Set(reference_number.clone()),
            shipment_carrier: Set(new.shipment_carrier),
            shipping_document: Set(new.shipping_document),
            customer_po: Set(new.customer_po),
            customer_name: Set(new.customer_name),
            comments: Set(new.comments),
            related_transaction_id: Set(new.related_transaction_id),
            created_by: Set(Some(actor)),
            last_edited_by: Set(Some(actor)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let header = header
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let details: Vec<transaction_detail::ActiveModel> = new
            .lines
            .into_iter()
            .map(|line| transaction_detail::ActiveModel {
                detail_id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_id),
                item_name: Set(line.item_name),
                quantity: Set(line.quantity),
                inventory_status: Set(new.inventory_status.as_str().to_string()),
                status: Set(new.status.as_str().to_string()),
                lot_number: Set(line.lot_number),
                comments: Set(line.comments),
                created_by: Set(Some(actor)),
                last_edited_by: Set(Some(actor)),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .collect();

        TransactionDetail::insert_many(details)
            .exec(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(
            "Created {} transaction {}",
            header.transaction_type, reference_number
        );

        self.event_sender
            .send(Event::TransactionCreated {
                transaction_id,
                reference_number,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(header)
    }

    /// Creates the two legs of a transfer order. The Outbound leg is
    /// written first; only on its success is the linked Inbound leg
    /// created at the destination (status forced to Pending, date offset
    /// by business days). An Inbound failure leaves an unpaired Outbound.
    #[instrument(skip(self, transfer))]
    pub async fn create_transfer(
        &self,
        transfer: NewTransferOrder,
        default_lead_days: u32,
        actor: Uuid,
    ) -> Result<(transaction_header::Model, transaction_header::Model), ServiceError> {
        if transfer.source_warehouse == transfer.destination_warehouse {
            return Err(ServiceError::ValidationError(
                "Source and destination warehouses must differ".into(),
            ));
        }
        check_status(TransactionType::Outbound, transfer.outbound_status)?;

        let outbound = self
            .create(
                NewTransaction {
                    transaction_type: TransactionType::Outbound,
                    transaction_date: transfer.transaction_date,
                    warehouse: Some(transfer.source_warehouse),
                    reference_type: Some("Transfer Order".into()),
                    status: transfer.outbound_status,
                    inventory_status: transfer.inventory_status,
                    shipment_carrier: transfer.shipment_carrier.clone(),
                    shipping_document: transfer.shipping_document.clone(),
                    customer_po: None,
                    customer_name: None,
                    comments: transfer.comments.clone(),
                    related_transaction_id: None,
                    lines: transfer.lines.clone(),
                },
                actor,
            )
            .await?;

        let lead_days = transfer.lead_days.unwrap_or(default_lead_days);
        let inbound_date = add_business_days(transfer.transaction_date, lead_days);

        let inbound = self
            .create(
                NewTransaction {
                    transaction_type: TransactionType::Inbound,
                    transaction_date: inbound_date,
                    warehouse: Some(transfer.destination_warehouse),
                    reference_type: Some("Transfer Order".into()),
                    status: LineStatus::Pending,
                    inventory_status: transfer
                        .destination_inventory_status
                        .unwrap_or(transfer.inventory_status),
                    shipment_carrier: transfer.shipment_carrier,
                    shipping_document: transfer.shipping_document,
                    customer_po: None,
                    customer_name: None,
                    comments: transfer.comments,
                    related_transaction_id: Some(outbound.transaction_id),
                    lines: transfer.lines,
                },
                actor,
            )
            .await?;

        self.event_sender
            .send(Event::TransferCreated {
                outbound_id: outbound.transaction_id,
                inbound_id: inbound.transaction_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok((outbound, inbound))
    }

    /// Updates the fixed editable header field set, stamping the editor.
    pub async fn update_header(
        &self,
        transaction_id: Uuid,
        update: UpdateTransactionHeader,
        actor: Uuid,
    ) -> Result<transaction_header::Model, ServiceError> {
        let header = TransactionHeader::find_by_id(transaction_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let mut active: transaction_header::ActiveModel = header.into();
        if let Some(date) = update.transaction_date {
            active.transaction_date = Set(date);
        }
        if let Some(warehouse) = update.warehouse {
            active.warehouse = Set(Some(warehouse));
        }
        if let Some(carrier) = update.shipment_carrier {
            active.shipment_carrier = Set(Some(carrier));
        }
        if let Some(document) = update.shipping_document {
            active.shipping_document = Set(Some(document));
        }
        if let Some(po) = update.customer_po {
            active.customer_po = Set(Some(po));
        }
        if let Some(name) = update.customer_name {
            active.customer_name = Set(Some(name));
        }
        if let Some(comments) = update.comments {
            active.comments = Set(Some(comments));
        }
        active.last_edited_by = Set(Some(actor));
        active.updated_at = Set(Utc::now().into());

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::TransactionUpdated(transaction_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Updates one detail line. The new line status is validated against
    /// the header's transaction type before anything is written.
    pub async fn update_detail(
        &self,
        transaction_id: Uuid,
        detail_id: Uuid,
        update: UpdateTransactionDetail,
        actor: Uuid,
    ) -> Result<transaction_detail::Model, ServiceError> {
        let detail = TransactionDetail::find_by_id(detail_id)
            .filter(transaction_detail::Column::TransactionId.eq(transaction_id))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction detail {} not found", detail_id))
            })?;

        if let Some(status) = update.status {
            let header = TransactionHeader::find_by_id(transaction_id)
                .one(self.db.as_ref())
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
                })?;
            let ttype: TransactionType =
                header.transaction_type.parse().map_err(|_| {
                    ServiceError::InternalError(format!(
                        "Unknown transaction type {:?}",
                        header.transaction_type
                    ))
                })?;
            check_status(ttype, status)?;
        }

        let mut active: transaction_detail::ActiveModel = detail.into();
        if let Some(quantity) = update.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(inventory_status) = update.inventory_status {
            active.inventory_status = Set(inventory_status.as_str().to_string());
        }
        if let Some(status) = update.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(lot_number) = update.lot_number {
            active.lot_number = Set(Some(lot_number));
        }
        if let Some(comments) = update.comments {
            active.comments = Set(Some(comments));
        }
        active.last_edited_by = Set(Some(actor));
        active.updated_at = Set(Utc::now().into());

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::TransactionUpdated(transaction_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Deletes one detail line.
    pub async fn delete_detail(
        &self,
        transaction_id: Uuid,
        detail_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = TransactionDetail::delete_many()
            .filter(transaction_detail::Column::TransactionId.eq(transaction_id))
            .filter(transaction_detail::Column::DetailId.eq(detail_id))
            .exec(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Transaction detail {} not found",
                detail_id
            )));
        }

        self.event_sender
            .send(Event::TransactionUpdated(transaction_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }

    /// Deletes a header and all of its details. Refused while any other
    /// header references it through related_transaction_id; the error
    /// names the blocking reference numbers.
    #[instrument(skip(self))]
    pub async fn delete_header(&self, transaction_id: Uuid) -> Result<(), ServiceError> {
        let header = TransactionHeader::find_by_id(transaction_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let related = TransactionHeader::find()
            .filter(transaction_header::Column::RelatedTransactionId.eq(transaction_id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if !related.is_empty() {
            let references: Vec<String> =
                related.into_iter().map(|h| h.reference_number).collect();
            return Err(ServiceError::Conflict(format!(
                "Cannot delete transaction. Related transactions exist: {}",
                references.join(", ")
            )));
        }

        TransactionDetail::delete_many()
            .filter(transaction_detail::Column::TransactionId.eq(transaction_id))
            .exec(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        TransactionHeader::delete_by_id(transaction_id)
            .exec(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!("Deleted transaction {}", header.reference_number);

        self.event_sender
            .send(Event::TransactionDeleted {
                transaction_id,
                reference_number: header.reference_number,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }

    /// All transactions grouped with their lines, newest first.
    pub async fn list(&self) -> Result<Vec<TransactionView>, ServiceError> {
        let rows = TransactionFull::find()
            .order_by_desc(transaction_full::Column::TransactionDate)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(group_view_rows(rows))
    }

    /// One transaction with its lines.
    pub async fn get(&self, transaction_id: Uuid) -> Result<TransactionView, ServiceError> {
        let rows = TransactionFull::find()
            .filter(transaction_full::Column::TransactionId.eq(transaction_id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        group_view_rows(rows).into_iter().next().ok_or_else(|| {
            ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn invalid_status_is_rejected_with_a_descriptive_error() {
        let err = check_status(TransactionType::Inbound, LineStatus::Shipped).unwrap_err();
        assert_matches!(err, ServiceError::InvalidStatus(msg) => {
            assert!(msg.contains("Shipped"));
            assert!(msg.contains("Inbound"));
        });
        assert!(check_status(TransactionType::Inbound, LineStatus::Received).is_ok());
        assert!(check_status(TransactionType::Outbound, LineStatus::Shipped).is_ok());
        assert!(check_status(TransactionType::Adjustment, LineStatus::Completed).is_ok());
    }

    fn view_row(
        transaction_id: Uuid,
        detail_id: Uuid,
        item: &str,
        quantity: Decimal,
    ) -> transaction_full::Model {
        transaction_full::Model {
            transaction_id,
            transaction_type: "Outbound".into(),
            transaction_date: "2024-02-01".parse().unwrap(),
            reference_type: Some("Transfer Order".into()),
            reference_number: "OB-100001".into(),
            customer_po: None,
            customer_name: None,
            warehouse: Some("WH-A".into()),
            shipment_carrier: None,
            shipping_document: None,
            header_comments: None,
            related_transaction_id: None,
            header_created_at: Utc::now().into(),
            header_last_updated_at: Utc::now().into(),
            detail_id,
            item_name: item.into(),
            quantity,
            inventory_status: "Stock".into(),
            lot_number: None,
            detail_comments: None,
            detail_status: "Shipped".into(),
            created_by: None,
            last_edited_by: None,
            created_by_name: Some("Sam Field".into()),
            last_edited_by_name: None,
        }
    }

    #[test]
    fn view_rows_group_by_transaction_preserving_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let rows = vec![
            view_row(first, Uuid::new_v4(), "Gizmo", dec!(50)),
            view_row(first, Uuid::new_v4(), "Widget", dec!(10)),
            view_row(second, Uuid::new_v4(), "Gadget", dec!(5)),
        ];

        let grouped = group_view_rows(rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].transaction_id, first);
        assert_eq!(grouped[0].details.len(), 2);
        assert_eq!(grouped[0].details[0].item_name, "Gizmo");
        assert_eq!(grouped[1].transaction_id, second);
        assert_eq!(grouped[1].details.len(), 1);
    }
}
