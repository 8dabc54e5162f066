use crate::{
    db::DbPool,
    entities::{
        customer::{self, Entity as CustomerEntity, Model as CustomerModel},
        order::{
            self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::plate::normalize_plate,
};
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenOrderRequest {
    #[validate(length(min = 1, message = "Plate number is required"))]
    pub plate_number: String,
    /// "service" or "sales"; defaults to "service".
    pub order_type: Option<String>,
    pub description: Option<String>,
    pub estimated_duration: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

fn generate_order_number(now: &DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Service for started orders and their finalize-on-invoice transition.
///
/// An order opens when a vehicle arrives, carrying only branch, plate and
/// `started_at`. It stays in status `created` until exactly one invoice links
/// to it; `update_order_from_invoice` performs that transition and is the only
/// write path out of `created` besides cancellation.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Opens a started order for a vehicle that just arrived. Customer and
    /// vehicle stay unset until invoice time.
    #[instrument(skip(self, request), fields(branch_id = %branch_id, plate = %request.plate_number))]
    pub async fn open_order(
        &self,
        branch_id: Uuid,
        request: OpenOrderRequest,
    ) -> Result<OrderModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let plate = normalize_plate(&request.plate_number);
        if plate.is_empty() {
            return Err(ServiceError::ValidationError(
                "Plate number is required".to_string(),
            ));
        }

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

        let model = self
            .insert_started_order(
                &*self.db_pool,
                branch_id,
                &plate,
                order_type,
                request.description,
                request.estimated_duration,
            )
            .await?;

        info!(order_id = %model.id, order_number = %model.order_number, "Order opened");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderOpened {
                    order_id: model.id,
                    branch_id,
                    started_at: model.started_at,
                })
                .await
            {
                warn!(error = %e, order_id = %model.id, "Failed to send order opened event");
            }
        }

        Ok(model)
    }

    /// Inserts a fresh started order on any connection, including a caller's
    /// transaction (the invoice fallback path creates its order this way so a
    /// failed invoice rolls the order back too). The plate must already be
    /// normalized.
    pub(crate) async fn insert_started_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        branch_id: Uuid,
        plate: &str,
        order_type: &str,
        description: Option<String>,
        estimated_duration: Option<i32>,
    ) -> Result<OrderModel, ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let active = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number(&now)),
            branch_id: Set(branch_id),
            customer_id: Set(None),
            vehicle_id: Set(None),
            plate_number: Set(plate.to_string()),
            order_type: Set(order_type.to_string()),
            status: Set(order::STATUS_CREATED.to_string()),
            started_at: Set(now),
            finalized_at: Set(None),
            description: Set(description.filter(|s| !s.trim().is_empty())),
            estimated_duration: Set(estimated_duration),
            created_at: Set(now),
            updated_at: Set(None),
            version: Set(1),
        };

        active.insert(conn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert started order");
            ServiceError::DatabaseError(e)
        })
    }

    /// Returns the most recently started `created` order for the branch and
    /// plate, or None. Used when exactly one candidate is expected.
    #[instrument(skip(self), fields(branch_id = %branch_id, plate = %plate_number))]
    pub async fn find_started_order_by_plate(
        &self,
        branch_id: Uuid,
        plate_number: &str,
    ) -> Result<Option<OrderModel>, ServiceError> {
        let plate = normalize_plate(plate_number);
        if plate.is_empty() {
            return Ok(None);
        }

        OrderEntity::find()
            .filter(order::Column::BranchId.eq(branch_id))
            .filter(order::Column::PlateNumber.eq(plate))
            .filter(order::Column::Status.eq(order::STATUS_CREATED))
            .order_by_desc(order::Column::StartedAt)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Returns every `created` order for the branch and plate, newest first.
    /// Empty when none match; the caller presents the choice, never guesses.
    #[instrument(skip(self), fields(branch_id = %branch_id, plate = %plate_number))]
    pub async fn find_all_started_orders_for_plate(
        &self,
        branch_id: Uuid,
        plate_number: &str,
    ) -> Result<Vec<OrderModel>, ServiceError> {
        let plate = normalize_plate(plate_number);
        if plate.is_empty() {
            return Ok(Vec::new());
        }

        OrderEntity::find()
            .filter(order::Column::BranchId.eq(branch_id))
            .filter(order::Column::PlateNumber.eq(plate))
            .filter(order::Column::Status.eq(order::STATUS_CREATED))
            .order_by_desc(order::Column::StartedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Finalizes a started order with the customer and vehicle an invoice
    /// resolved, inside the caller's transaction.
    ///
    /// The order row is re-read under an exclusive row lock; if it is no
    /// longer in `created` status (a concurrent invoice won the race) the
    /// link fails with Conflict and the transaction rolls back. `started_at`
    /// and `order_number` are never touched. The customer's visit counters
    /// are bumped in the same transaction.
    #[instrument(skip(self, txn, customer), fields(order_id = %order_id, customer_id = %customer.id))]
    pub async fn update_order_from_invoice(
        &self,
        txn: &DatabaseTransaction,
        branch_id: Uuid,
        order_id: Uuid,
        customer: &CustomerModel,
        vehicle_id: Option<Uuid>,
        description: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .filter(order::Column::BranchId.eq(branch_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.status != order::STATUS_CREATED {
            warn!(order_id = %order_id, status = %order.status, "Refusing to finalize non-started order");
            return Err(ServiceError::Conflict(format!(
                "Order {} is no longer in created status",
                order.order_number
            )));
        }

        let now = Utc::now();
        let version = order.version;
        let mut active: OrderActiveModel = order.into();
        active.customer_id = Set(Some(customer.id));
        active.vehicle_id = Set(vehicle_id);
        if let Some(desc) = description.filter(|s| !s.trim().is_empty()) {
            active.description = Set(Some(desc));
        }
        active.status = Set(order::STATUS_INVOICED.to_string());
        active.finalized_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        active.version = Set(version + 1);

        let updated = active.update(txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to finalize order");
            ServiceError::DatabaseError(e)
        })?;

        // visit tracking rides the same transaction; the increment happens
        // in SQL so two concurrent finalizes for the same customer both count
        CustomerEntity::update_many()
            .col_expr(
                customer::Column::VisitCount,
                Expr::col(customer::Column::VisitCount).add(1),
            )
            .col_expr(customer::Column::LastVisitAt, Expr::value(now))
            .col_expr(customer::Column::UpdatedAt, Expr::value(now))
            .filter(customer::Column::Id.eq(customer.id))
            .exec(txn)
            .await?;

        info!(order_id = %order_id, customer_id = %customer.id, "Order finalized from invoice");
        Ok(updated)
    }

    /// Fetches an order by id within the branch.
    #[instrument(skip(self), fields(branch_id = %branch_id, order_id = %order_id))]
    pub async fn get_order(
        &self,
        branch_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .filter(order::Column::BranchId.eq(branch_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Lists orders in the branch, newest first.
    #[instrument(skip(self), fields(branch_id = %branch_id))]
    pub async fn list_orders(
        &self,
        branch_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = OrderEntity::find()
            .filter(order::Column::BranchId.eq(branch_id))
            .order_by_desc(order::Column::StartedAt)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }
}
