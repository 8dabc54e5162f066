use crate::{
    db::DbPool,
    entities::{
        invoice::{
            self, ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity, Model as InvoiceModel,
        },
        order::{self, Model as OrderModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        customers::{CustomerDetails, CustomerService},
        orders::OrderService,
        plate::normalize_plate,
        vehicles::VehicleService,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Invoice-creation submission. Either `selected_order_id` names a started
/// order explicitly, or enough data is supplied to open a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Started order the user picked from the candidate list.
    pub selected_order_id: Option<Uuid>,
    pub plate_number: Option<String>,
    /// When set and no order was selected, a single started order matching
    /// the plate is linked automatically.
    #[serde(default)]
    pub link_by_plate: bool,

    pub customer_id: Option<Uuid>,
    pub customer: Option<CustomerDetails>,

    pub invoice_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub total_amount: Option<Decimal>,

    /// Applied to the linked order on finalize.
    pub order_description: Option<String>,
    /// Used only when a new order has to be opened.
    pub order_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateInvoiceResponse {
    pub invoice: InvoiceModel,
    pub order_id: Uuid,
    pub order_number: String,
    /// True when the invoice linked an already-started order rather than
    /// opening a new one.
    pub linked_existing_order: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

fn generate_invoice_number(now: &DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Service for invoices and the transactional link to started orders.
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    orders: OrderService,
    customers: CustomerService,
    vehicles: VehicleService,
}

impl InvoiceService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        orders: OrderService,
        customers: CustomerService,
        vehicles: VehicleService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            orders,
            customers,
            vehicles,
        }
    }

    /// Creates an invoice and links it to a started order, opening a new
    /// order when none was selected and none matched.
    ///
    /// The order update and the invoice insert happen in one transaction;
    /// any failure rolls back both. Customer and vehicle resolution run
    /// before the transaction, each idempotent under its unique constraint,
    /// so a retried submission converges on the same rows.
    #[instrument(skip(self, request), fields(branch_id = %branch_id))]
    pub async fn create_invoice(
        &self,
        branch_id: Uuid,
        request: CreateInvoiceRequest,
    ) -> Result<CreateInvoiceResponse, ServiceError> {
        let submitted_plate = request
            .plate_number
            .as_deref()
            .map(normalize_plate)
            .filter(|p| !p.is_empty());

        // Resolve the order candidate first: an explicit selection must exist
        // and still be a started order. No silent fallback for a stale pick.
        let mut selected: Option<OrderModel> = None;
        if let Some(order_id) = request.selected_order_id {
            let order = self.orders.get_order(branch_id, order_id).await?;
            if order.status != order::STATUS_CREATED {
                return Err(ServiceError::Conflict(format!(
                    "Order {} is no longer in created status",
                    order.order_number
                )));
            }
            selected = Some(order);
        } else if request.link_by_plate {
            if let Some(plate) = submitted_plate.as_deref() {
                // Auto-link only when the plate is unambiguous. Several
                // candidates mean the caller has to pick one explicitly.
                let mut candidates = self
                    .orders
                    .find_all_started_orders_for_plate(branch_id, plate)
                    .await?;
                if candidates.len() > 1 {
                    return Err(ServiceError::Conflict(format!(
                        "{} started orders match plate {}, select one explicitly",
                        candidates.len(),
                        plate
                    )));
                }
                selected = candidates.pop();
            }
        }

        let plate = submitted_plate
            .clone()
            .or_else(|| selected.as_ref().map(|o| o.plate_number.clone()));

        // Customer resolution priority: explicit id, then submitted details,
        // then the owner of any vehicle with this plate.
        let customer = if let Some(customer_id) = request.customer_id {
            self.customers.get_customer(branch_id, customer_id).await?
        } else if let Some(details) = request.customer.clone() {
            let (customer, _created) = self
                .customers
                .create_or_get_customer(branch_id, details)
                .await?;
            customer
        } else if let Some(plate) = plate.as_deref() {
            self.vehicles
                .find_customer_by_plate(branch_id, plate)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Could not identify a customer from the submitted data".to_string(),
                    )
                })?
        } else {
            return Err(ServiceError::ValidationError(
                "An invoice needs a customer: select an order, name a customer, or give a plate"
                    .to_string(),
            ));
        };

        let vehicle_id = match plate.as_deref() {
            Some(p) => Some(
                self.vehicles
                    .create_or_get_vehicle(customer.id, p, None, None)
                    .await?
                    .id,
            ),
            None => None,
        };

        let now = Utc::now();
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start invoice transaction");
            ServiceError::DatabaseError(e)
        })?;

        let linked_existing_order = selected.is_some();
        let order = match selected {
            Some(order) => order,
            None => {
                // fallback path: no selection and no auto-link match
                let plate = plate.as_deref().ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Plate number is required to open a new order".to_string(),
                    )
                })?;
                let order_type = match request.order_type.as_deref() {
                    None | Some(order::TYPE_SERVICE) => order::TYPE_SERVICE,
                    Some(order::TYPE_SALES) => order::TYPE_SALES,
                    Some(other) => {
                        return Err(ServiceError::ValidationError(format!(
                            "Unknown order type: {}",
                            other
                        )))
                    }
                };
                self.orders
                    .insert_started_order(
                        &txn,
                        branch_id,
                        plate,
                        order_type,
                        request.order_description.clone(),
                        None,
                    )
                    .await?
            }
        };

        let subtotal = request.subtotal.unwrap_or(Decimal::ZERO);
        let tax_amount = request.tax_amount.unwrap_or(Decimal::ZERO);
        let total_amount = request.total_amount.unwrap_or(subtotal + tax_amount);

        let invoice_id = Uuid::new_v4();
        let active = InvoiceActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(generate_invoice_number(&now)),
            branch_id: Set(branch_id),
            order_id: Set(order.id),
            customer_id: Set(customer.id),
            vehicle_id: Set(vehicle_id),
            invoice_date: Set(request.invoice_date.unwrap_or_else(|| now.date_naive())),
            reference: Set(request
                .reference
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| plate.clone())),
            notes: Set(request.notes.clone().filter(|s| !s.trim().is_empty())),
            subtotal: Set(subtotal),
            tax_amount: Set(tax_amount),
            total_amount: Set(total_amount),
            status: Set(invoice::STATUS_DRAFT.to_string()),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let invoice_model = match active.insert(&txn).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ServiceError::Conflict(format!(
                    "An invoice already exists for order {}",
                    order.order_number
                )));
            }
            Err(e) => {
                error!(error = %e, order_id = %order.id, "Failed to insert invoice");
                return Err(ServiceError::DatabaseError(e));
            }
        };

        let finalized = self
            .orders
            .update_order_from_invoice(
                &txn,
                branch_id,
                order.id,
                &customer,
                vehicle_id,
                request.order_description.clone(),
            )
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to commit invoice transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice_model.invoice_number,
            order_id = %finalized.id,
            linked_existing_order,
            "Invoice created"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::InvoiceCreated(invoice_id)).await {
                warn!(error = %e, invoice_id = %invoice_id, "Failed to send invoice created event");
            }
            if let Err(e) = event_sender
                .send(Event::OrderFinalized {
                    order_id: finalized.id,
                    invoice_id,
                })
                .await
            {
                warn!(error = %e, order_id = %finalized.id, "Failed to send order finalized event");
            }
        }

        Ok(CreateInvoiceResponse {
            invoice: invoice_model,
            order_id: finalized.id,
            order_number: finalized.order_number,
            linked_existing_order,
        })
    }

    /// Fetches an invoice by id within the branch.
    #[instrument(skip(self), fields(branch_id = %branch_id, invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        branch_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceModel, ServiceError> {
        InvoiceEntity::find_by_id(invoice_id)
            .filter(invoice::Column::BranchId.eq(branch_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))
    }

    /// Lists invoices in the branch, newest first, optionally restricted to
    /// one order.
    #[instrument(skip(self), fields(branch_id = %branch_id))]
    pub async fn list_invoices(
        &self,
        branch_id: Uuid,
        order_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<InvoiceListResponse, ServiceError> {
        let mut query = InvoiceEntity::find().filter(invoice::Column::BranchId.eq(branch_id));
        if let Some(order_id) = order_id {
            query = query.filter(invoice::Column::OrderId.eq(order_id));
        }

        let paginator = query
            .order_by_desc(invoice::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let invoices = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(InvoiceListResponse {
            invoices,
            total,
            page,
            per_page,
        })
    }

    /// Moves a draft invoice to `issued`.
    #[instrument(skip(self), fields(branch_id = %branch_id, invoice_id = %invoice_id))]
    pub async fn issue_invoice(
        &self,
        branch_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceModel, ServiceError> {
        let inv = self.get_invoice(branch_id, invoice_id).await?;
        if inv.status != invoice::STATUS_DRAFT {
            return Err(ServiceError::InvalidOperation(format!(
                "Invoice {} is {}, only drafts can be issued",
                inv.invoice_number, inv.status
            )));
        }

        let mut active: InvoiceActiveModel = inv.into();
        active.status = Set(invoice::STATUS_ISSUED.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db_pool).await?;

        info!(invoice_id = %invoice_id, "Invoice issued");
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::InvoiceIssued(invoice_id)).await {
                warn!(error = %e, invoice_id = %invoice_id, "Failed to send invoice issued event");
            }
        }
        Ok(updated)
    }

    /// Cancels an invoice. Cancelling twice is a no-op.
    #[instrument(skip(self), fields(branch_id = %branch_id, invoice_id = %invoice_id))]
    pub async fn cancel_invoice(
        &self,
        branch_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceModel, ServiceError> {
        let inv = self.get_invoice(branch_id, invoice_id).await?;
        if inv.status == invoice::STATUS_CANCELLED {
            return Ok(inv);
        }

        let mut active: InvoiceActiveModel = inv.into();
        active.status = Set(invoice::STATUS_CANCELLED.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db_pool).await?;

        info!(invoice_id = %invoice_id, "Invoice cancelled");
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::InvoiceCancelled(invoice_id)).await {
                warn!(error = %e, invoice_id = %invoice_id, "Failed to send invoice cancelled event");
            }
        }
        Ok(updated)
    }
}
