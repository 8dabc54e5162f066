use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Order lifecycle statuses.
///
/// An order opens in `created` ("started order") knowing only the plate and
/// branch; it leaves `created` exactly once, when an invoice is linked.
pub const STATUS_CREATED: &str = "created";
pub const STATUS_INVOICED: &str = "invoiced";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const TYPE_SERVICE: &str = "service";
pub const TYPE_SALES: &str = "sales";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    pub branch_id: Uuid,

    /// Null until the order is finalized by an invoice.
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,

    /// Denormalized, normalized plate string; lookup key for started orders.
    #[validate(length(min = 1, max = 20, message = "Plate must be between 1 and 20 characters"))]
    pub plate_number: String,

    pub order_type: String,
    pub status: String,

    /// Set once when the order is opened; never overwritten afterwards.
    pub started_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,

    pub description: Option<String>,
    pub estimated_duration: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoices,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
