use crate::{
    db::DbPool,
    entities::customer::{
        self, ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Phones are the dedup key; stored without interior whitespace.
fn normalize_phone(raw: &str) -> String {
    raw.split_whitespace().collect::<String>()
}

/// Service for customer records, branch-scoped throughout.
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Finds the customer with this phone in the branch, creating one when
    /// absent. Concurrent identical submissions are resolved by the unique
    /// `(branch_id, phone)` index: the loser of the insert race re-selects
    /// the winner's row instead of failing.
    ///
    /// Returns the model and whether a new row was created.
    #[instrument(skip(self, details), fields(branch_id = %branch_id, phone = %details.phone))]
    pub async fn create_or_get_customer(
        &self,
        branch_id: Uuid,
        details: CustomerDetails,
    ) -> Result<(CustomerModel, bool), ServiceError> {
        details
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let phone = normalize_phone(&details.phone);

        if let Some(existing) = self.find_by_phone(branch_id, &phone).await? {
            return Ok((existing, false));
        }

        let now = Utc::now();
        let customer_id = Uuid::new_v4();
        let active = CustomerActiveModel {
            id: Set(customer_id),
            branch_id: Set(branch_id),
            full_name: Set(details.full_name.trim().to_string()),
            phone: Set(phone.clone()),
            email: Set(details.email.filter(|s| !s.trim().is_empty())),
            address: Set(details.address.filter(|s| !s.trim().is_empty())),
            visit_count: Set(0),
            last_visit_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        match active.insert(db).await {
            Ok(model) => {
                info!(customer_id = %customer_id, "Customer created");
                if let Some(event_sender) = &self.event_sender {
                    if let Err(e) = event_sender.send(Event::CustomerCreated(customer_id)).await {
                        warn!(error = %e, customer_id = %customer_id, "Failed to send customer created event");
                    }
                }
                Ok((model, true))
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // lost the insert race to an identical submission
                warn!(branch_id = %branch_id, "Concurrent customer insert, re-selecting winner");
                let winner = self
                    .find_by_phone(branch_id, &phone)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(
                            "customer vanished after unique conflict".to_string(),
                        )
                    })?;
                Ok((winner, false))
            }
            Err(e) => {
                error!(error = %e, branch_id = %branch_id, "Failed to create customer");
                Err(ServiceError::DatabaseError(e))
            }
        }
    }

    async fn find_by_phone(
        &self,
        branch_id: Uuid,
        phone: &str,
    ) -> Result<Option<CustomerModel>, ServiceError> {
        CustomerEntity::find()
            .filter(customer::Column::BranchId.eq(branch_id))
            .filter(customer::Column::Phone.eq(phone))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Fetches a customer by id within the branch.
    #[instrument(skip(self), fields(branch_id = %branch_id, customer_id = %customer_id))]
    pub async fn get_customer(
        &self,
        branch_id: Uuid,
        customer_id: Uuid,
    ) -> Result<CustomerModel, ServiceError> {
        CustomerEntity::find_by_id(customer_id)
            .filter(customer::Column::BranchId.eq(branch_id))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    /// Lists customers in the branch, newest first.
    #[instrument(skip(self), fields(branch_id = %branch_id))]
    pub async fn list_customers(
        &self,
        branch_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<CustomerListResponse, ServiceError> {
        let paginator = CustomerEntity::find()
            .filter(customer::Column::BranchId.eq(branch_id))
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(CustomerListResponse {
            customers,
            total,
            page,
            per_page,
        })
    }
}
