use crate::{
    db::DbPool,
    entities::transaction_detail::{self, Entity as TransactionDetail},
    entities::transaction_header,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{InventoryStatus, LineStatus, TransactionType},
    services::inventory::{InventoryService, InventorySnapshot},
    services::transactions::TransactionService,
};
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Steps of the count workflow, strictly linear and back-navigable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CountStep {
    Warehouse,
    Date,
    Count,
    Variance,
    Adjustment,
}

impl CountStep {
    fn previous(self) -> Option<CountStep> {
        match self {
            CountStep::Warehouse => None,
            CountStep::Date => Some(CountStep::Warehouse),
            CountStep::Count => Some(CountStep::Date),
            CountStep::Variance => Some(CountStep::Count),
            CountStep::Adjustment => Some(CountStep::Variance),
        }
    }
}

/// One physical count entry. Not persisted until the adjustment is
/// generated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountLine {
    pub item_name: String,
    pub inventory_status: InventoryStatus,
    pub quantity: Decimal,
    /// Derived from quantity via uom_per_each and vice versa.
    pub case_count: Decimal,
    pub uom_per_each: Option<Decimal>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VarianceLine {
    pub item_name: String,
    pub inventory_status: InventoryStatus,
    pub physical_count: Decimal,
    pub calculated_count: Decimal,
    pub variance: Decimal,
}

/// Informational row shown during variance review: a still-Pending line
/// at the warehouse that is not part of the variance math.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingTransactionLine {
    pub reference_number: String,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub item_name: String,
    pub quantity: Decimal,
    pub inventory_status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountWorkflow {
    pub id: Uuid,
    pub step: CountStep,
    pub warehouse: Option<String>,
    pub count_date: Option<NaiveDate>,
    #[serde(skip)]
    pub snapshot: Option<InventorySnapshot>,
    pub lines: Vec<CountLine>,
    /// Full variance list; zero-variance rows are retained here and only
    /// hidden from review.
    pub variances: Vec<VarianceLine>,
    pub pending: Vec<PendingTransactionLine>,
    pub adjustment_id: Option<Uuid>,
}

impl CountWorkflow {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: CountStep::Warehouse,
            warehouse: None,
            count_date: None,
            snapshot: None,
            lines: Vec::new(),
            variances: Vec::new(),
            pending: Vec::new(),
            adjustment_id: None,
        }
    }

    /// Variances shown for review.
    pub fn nonzero_variances(&self) -> Vec<VarianceLine> {
        self.variances
            .iter()
            .filter(|v| !v.variance.is_zero())
            .cloned()
            .collect()
    }
}

/// Variance per count line: physical minus the snapshot's value for the
/// same item and status (zero when absent). Pure and idempotent over
/// unchanged inputs.
pub fn compute_variances(lines: &[CountLine], snapshot: &InventorySnapshot) -> Vec<VarianceLine> {
    lines
        .iter()
        .map(|line| {
            let calculated = snapshot.on_hand_for(&line.item_name, line.inventory_status);
            VarianceLine {
                item_name: line.item_name.clone(),
                inventory_status: line.inventory_status,
                physical_count: line.quantity,
                calculated_count: calculated,
                variance: line.quantity - calculated,
            }
        })
        .collect()
}

/// Fields a count-entry edit may carry; quantity and case count are
/// mutually derived.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CountLineUpdate {
    pub quantity: Option<Decimal>,
    pub case_count: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct CountService {
    db: Arc<DbPool>,
    inventory: InventoryService,
    transactions: Arc<TransactionService>,
    event_sender: EventSender,
    workflows: Arc<DashMap<Uuid, CountWorkflow>>,
}

impl CountService {
    pub fn new(
        db: Arc<DbPool>,
        inventory: InventoryService,
        transactions: Arc<TransactionService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            inventory,
            transactions,
            event_sender,
            workflows: Arc::new(DashMap::new()),
        }
    }

    pub fn start(&self) -> CountWorkflow {
        let workflow = CountWorkflow::new();
        self.workflows.insert(workflow.id, workflow.clone());
        workflow
    }

    pub fn get(&self, id: Uuid) -> Result<CountWorkflow, ServiceError> {
        self.workflows
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("Count workflow {} not found", id)))
    }

    fn with_workflow<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut CountWorkflow) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut entry = self
            .workflows
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Count workflow {} not found", id)))?;
        f(entry.value_mut())
    }

    fn expect_step(workflow: &CountWorkflow, step: CountStep) -> Result<(), ServiceError> {
        if workflow.step == step {
            Ok(())
        } else {
            Err(ServiceError::InvalidOperation(format!(
                "Workflow is at the {:?} step",
                workflow.step
            )))
        }
    }

    /// Step 1: pick a warehouse by exact common name.
    pub async fn select_warehouse(
        &self,
        id: Uuid,
        warehouse: &str,
    ) -> Result<CountWorkflow, ServiceError> {
        let known = self
            .inventory
            .list_warehouses(None)
            .await?
            .into_iter()
            .any(|w| w.common_name == warehouse);
        if !known {
            return Err(ServiceError::NotFound(format!(
                "Warehouse {} not found",
                warehouse
            )));
        }

        self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Warehouse)?;
            workflow.warehouse = Some(warehouse.to_string());
            workflow.step = CountStep::Date;
            Ok(workflow.clone())
        })
    }

    /// Step 2: pick the as-of date (≤ today, meaning end of that day) and
    /// pre-populate zero-quantity count lines from the snapshot.
    pub async fn select_date(&self, id: Uuid, date: NaiveDate) -> Result<CountWorkflow, ServiceError> {
        if date > Utc::now().date_naive() {
            return Err(ServiceError::ValidationError(
                "Count date cannot be in the future".into(),
            ));
        }

        let warehouse = self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Date)?;
            workflow
                .warehouse
                .clone()
                .ok_or_else(|| ServiceError::InvalidOperation("No warehouse selected".into()))
        })?;

        let snapshot = self.inventory.snapshot(&warehouse, date).await?;

        self.with_workflow(id, |workflow| {
            let mut lines = Vec::new();
            for snap in &snapshot.lines {
                for status in InventoryStatus::ALL {
                    if snap.on_hand.get(status) > Decimal::ZERO {
                        lines.push(CountLine {
                            item_name: snap.item_name.clone(),
                            inventory_status: status,
                            quantity: Decimal::ZERO,
                            case_count: Decimal::ZERO,
                            uom_per_each: snap.uom_per_each,
                            notes: String::new(),
                        });
                    }
                }
            }
            workflow.count_date = Some(date);
            workflow.snapshot = Some(snapshot.clone());
            workflow.lines = lines;
            workflow.variances.clear();
            workflow.pending.clear();
            workflow.step = CountStep::Count;
            Ok(workflow.clone())
        })
    }

    /// Step 3: record a physical quantity (or case count) for one line.
    /// Editing either field recomputes the other through the per-case
    /// multiplier.
    pub fn update_line(
        &self,
        id: Uuid,
        item_name: &str,
        status: InventoryStatus,
        update: CountLineUpdate,
    ) -> Result<CountWorkflow, ServiceError> {
        self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Count)?;
            let line = workflow
                .lines
                .iter_mut()
                .find(|l| l.item_name == item_name && l.inventory_status == status)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "No count line for {} ({})",
                        item_name, status
                    ))
                })?;

            match (update.quantity, update.case_count) {
                (Some(quantity), _) => {
                    line.quantity = quantity;
                    line.case_count = match line.uom_per_each {
                        Some(uom) if !uom.is_zero() => quantity / uom,
                        _ => Decimal::ZERO,
                    };
                }
                (None, Some(case_count)) => {
                    let uom = line.uom_per_each.filter(|u| !u.is_zero()).ok_or_else(|| {
                        ServiceError::InvalidOperation(format!(
                            "Item {} has no unit-of-measure multiplier",
                            item_name
                        ))
                    })?;
                    line.case_count = case_count;
                    line.quantity = case_count * uom;
                }
                (None, None) => {}
            }
            if let Some(notes) = update.notes {
                line.notes = notes;
            }
            Ok(workflow.clone())
        })
    }

    /// Step 3: add an item that was not in the snapshot, fetched by exact
    /// name.
    pub async fn add_item(
        &self,
        id: Uuid,
        item_name: &str,
        status: InventoryStatus,
    ) -> Result<CountWorkflow, ServiceError> {
        let (item, uom) = self
            .inventory
            .find_item(item_name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_name)))?;

        self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Count)?;
            if workflow
                .lines
                .iter()
                .any(|l| l.item_name == item.item_name && l.inventory_status == status)
            {
                return Err(ServiceError::Conflict(format!(
                    "Item {} ({}) is already on the count",
                    item.item_name, status
                )));
            }
            workflow.lines.push(CountLine {
                item_name: item.item_name.clone(),
                inventory_status: status,
                quantity: Decimal::ZERO,
                case_count: Decimal::ZERO,
                uom_per_each: uom,
                notes: String::new(),
            });
            Ok(workflow.clone())
        })
    }

    pub fn remove_line(
        &self,
        id: Uuid,
        item_name: &str,
        status: InventoryStatus,
    ) -> Result<CountWorkflow, ServiceError> {
        self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Count)?;
            let before = workflow.lines.len();
            workflow
                .lines
                .retain(|l| !(l.item_name == item_name && l.inventory_status == status));
            if workflow.lines.len() == before {
                return Err(ServiceError::NotFound(format!(
                    "No count line for {} ({})",
                    item_name, status
                )));
            }
            Ok(workflow.clone())
        })
    }

    /// Step 4: compute variances against the snapshot and surface pending
    /// lines for context.
    pub async fn review_variances(&self, id: Uuid) -> Result<CountWorkflow, ServiceError> {
        let (warehouse, date) = self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Count)?;
            if workflow.lines.is_empty() {
                return Err(ServiceError::ValidationError(
                    "At least one count line is required".into(),
                ));
            }
            Ok((
                workflow.warehouse.clone().unwrap_or_default(),
                workflow.count_date.unwrap_or_default(),
            ))
        })?;

        let pending = self.inventory.pending_lines(&warehouse, date).await?;
        let pending: Vec<PendingTransactionLine> = pending
            .into_iter()
            .flat_map(|(header, details)| {
                details
                    .into_iter()
                    .map(move |d| PendingTransactionLine {
                        reference_number: header.reference_number.clone(),
                        transaction_type: header.transaction_type.clone(),
                        transaction_date: header.transaction_date,
                        item_name: d.item_name,
                        quantity: d.quantity,
                        inventory_status: d.inventory_status,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        self.with_workflow(id, |workflow| {
            let snapshot = workflow
                .snapshot
                .as_ref()
                .ok_or_else(|| ServiceError::InvalidOperation("No snapshot loaded".into()))?;
            workflow.variances = compute_variances(&workflow.lines, snapshot);
            workflow.pending = pending;
            workflow.step = CountStep::Variance;
            Ok(workflow.clone())
        })
    }

    /// Step 5: post one Adjustment transaction for the count. One detail
    /// per nonzero variance; the header is written first and left in place
    /// if a detail insert fails afterwards.
    #[instrument(skip(self))]
    pub async fn generate_adjustment(&self, id: Uuid, actor: Uuid) -> Result<Uuid, ServiceError> {
        let (warehouse, date, variances) = self.with_workflow(id, |workflow| {
            Self::expect_step(workflow, CountStep::Variance)?;
            if workflow.variances.is_empty() {
                return Err(ServiceError::InvalidOperation(
                    "No variances to post".into(),
                ));
            }
            Ok((
                workflow.warehouse.clone().unwrap_or_default(),
                workflow.count_date.unwrap_or_default(),
                workflow.variances.clone(),
            ))
        })?;

        let reference_number = self
            .transactions
            .next_reference(TransactionType::Adjustment)
            .await?;
        let transaction_id = Uuid::new_v4();
        let now = Utc::now();

        let header = transaction_header::ActiveModel {
            transaction_id: Set(transaction_id),
            transaction_type: Set(TransactionType::Adjustment.as_str().to_string()),
            transaction_date: Set(date),
            warehouse: Set(Some(warehouse.clone())),
            reference_type: Set(Some("Inventory Count".into())),
            reference_number: Set(reference_number.clone()),
            shipment_carrier: Set(None),
            shipping_document: Set(None),
            customer_po: Set(None),
            customer_name: Set(None),
            comments: Set(Some(format!(
                "Inventory count adjustment for {} as of {}",
                warehouse, date
            ))),
            related_transaction_id: Set(None),
            created_by: Set(Some(actor)),
            last_edited_by: Set(Some(actor)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        header
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let details: Vec<transaction_detail::ActiveModel> = variances
            .iter()
            .filter(|v| !v.variance.is_zero())
            .map(|v| transaction_detail::ActiveModel {
                detail_id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_id),
                item_name: Set(v.item_name.clone()),
                quantity: Set(v.variance),
                inventory_status: Set(v.inventory_status.as_str().to_string()),
                status: Set(LineStatus::Completed.as_str().to_string()),
                lot_number: Set(None),
                comments: Set(Some(
                    if v.variance > Decimal::ZERO {
                        "Count overage"
                    } else {
                        "Count shortage"
                    }
                    .to_string(),
                )),
                created_by: Set(Some(actor)),
                last_edited_by: Set(Some(actor)),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .collect();

        let line_count = details.len();
        if !details.is_empty() {
            TransactionDetail::insert_many(details)
                .exec(self.db.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
        }

        info!(
            "Generated adjustment {} with {} lines for {} as of {}",
            reference_number, line_count, warehouse, date
        );

        self.event_sender
            .send(Event::AdjustmentGenerated {
                transaction_id,
                reference_number,
                line_count,
            })
            .await
            .map_err(ServiceError::EventError)?;
        self.event_sender
            .send(Event::CountCompleted {
                warehouse,
                count_date: date,
            })
            .await
            .map_err(ServiceError::EventError)?;

        self.with_workflow(id, |workflow| {
            workflow.adjustment_id = Some(transaction_id);
            workflow.step = CountStep::Adjustment;
            Ok(())
        })?;

        Ok(transaction_id)
    }

    /// Steps back one position in the linear flow.
    pub fn back(&self, id: Uuid) -> Result<CountWorkflow, ServiceError> {
        self.with_workflow(id, |workflow| {
            let previous = workflow.step.previous().ok_or_else(|| {
                ServiceError::InvalidOperation("Already at the first step".into())
            })?;
            workflow.step = previous;
            Ok(workflow.clone())
        })
    }

    pub fn discard(&self, id: Uuid) -> Result<(), ServiceError> {
        self.workflows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Count workflow {} not found", id)))
    }
}
