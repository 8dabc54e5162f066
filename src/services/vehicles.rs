use crate::{
    db::DbPool,
    entities::{
        customer::{self, Entity as CustomerEntity, Model as CustomerModel},
        vehicle::{
            self, ActiveModel as VehicleActiveModel, Entity as VehicleEntity, Model as VehicleModel,
        },
    },
    errors::ServiceError,
    services::plate::normalize_plate,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
    Set, SqlErr,
};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Service for vehicle records. Vehicles belong to a customer and carry the
/// normalized plate; branch scoping goes through the owning customer.
#[derive(Clone)]
pub struct VehicleService {
    db_pool: Arc<DbPool>,
}

impl VehicleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Finds the customer's vehicle with this plate, creating it when absent.
    /// Same insert-or-reselect pattern as customer dedup, keyed on the unique
    /// `(customer_id, plate_number)` index.
    #[instrument(skip(self), fields(customer_id = %customer_id, plate = %plate_number))]
    pub async fn create_or_get_vehicle(
        &self,
        customer_id: Uuid,
        plate_number: &str,
        make: Option<String>,
        model: Option<String>,
    ) -> Result<VehicleModel, ServiceError> {
        let plate = normalize_plate(plate_number);
        if plate.is_empty() {
            return Err(ServiceError::ValidationError(
                "Plate number is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        if let Some(existing) = self.find_for_customer(customer_id, &plate).await? {
            return Ok(existing);
        }

        let active = VehicleActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            plate_number: Set(plate.clone()),
            make: Set(make.filter(|s| !s.trim().is_empty())),
            model: Set(model.filter(|s| !s.trim().is_empty())),
            created_at: Set(Utc::now()),
        };

        match active.insert(db).await {
            Ok(vehicle) => Ok(vehicle),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                warn!(customer_id = %customer_id, "Concurrent vehicle insert, re-selecting winner");
                self.find_for_customer(customer_id, &plate)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(
                            "vehicle vanished after unique conflict".to_string(),
                        )
                    })
            }
            Err(e) => {
                error!(error = %e, customer_id = %customer_id, "Failed to create vehicle");
                Err(ServiceError::DatabaseError(e))
            }
        }
    }

    async fn find_for_customer(
        &self,
        customer_id: Uuid,
        plate: &str,
    ) -> Result<Option<VehicleModel>, ServiceError> {
        VehicleEntity::find()
            .filter(vehicle::Column::CustomerId.eq(customer_id))
            .filter(vehicle::Column::PlateNumber.eq(plate))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Resolves a customer through any vehicle with this plate in the branch.
    /// Last-resort customer resolution when an invoice arrives with only a
    /// plate.
    #[instrument(skip(self), fields(branch_id = %branch_id, plate = %plate_number))]
    pub async fn find_customer_by_plate(
        &self,
        branch_id: Uuid,
        plate_number: &str,
    ) -> Result<Option<CustomerModel>, ServiceError> {
        let plate = normalize_plate(plate_number);
        if plate.is_empty() {
            return Ok(None);
        }

        CustomerEntity::find()
            .join(JoinType::InnerJoin, customer::Relation::Vehicles.def())
            .filter(vehicle::Column::PlateNumber.eq(plate))
            .filter(customer::Column::BranchId.eq(branch_id))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
