use super::{common::PaginationParams, BranchScope};
use crate::{
    entities::{customer::Model as CustomerModel, order::Model as OrderModel},
    errors::ServiceError,
    services::orders::OpenOrderRequest,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PlateSearchParams {
    pub plate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
}

impl From<CustomerModel> for CustomerSummary {
    fn from(c: CustomerModel) -> Self {
        Self {
            id: c.id,
            full_name: c.full_name,
            phone: c.phone,
        }
    }
}

/// One candidate row in the started-order dropdown.
#[derive(Debug, Serialize)]
pub struct StartedOrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub plate_number: String,
    pub customer: Option<CustomerSummary>,
    pub started_at: DateTime<Utc>,
    pub order_type: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StartedOrdersResponse {
    pub orders: Vec<StartedOrderSummary>,
    pub count: usize,
}

/// GET /started?plate=… — candidate lookup for the invoice form.
/// No matches is a successful empty response, not an error.
async fn search_started_orders(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Query(params): Query<PlateSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let plate = params.plate.unwrap_or_default();
    if plate.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Plate number required".to_string(),
        ));
    }

    let orders = state
        .orders
        .find_all_started_orders_for_plate(branch_id, &plate)
        .await?;

    let mut summaries = Vec::with_capacity(orders.len());
    for order in orders {
        let customer = match order.customer_id {
            Some(id) => Some(state.customers.get_customer(branch_id, id).await?.into()),
            None => None,
        };
        summaries.push(summarize(order, customer));
    }

    let count = summaries.len();
    Ok(Json(StartedOrdersResponse {
        orders: summaries,
        count,
    }))
}

fn summarize(order: OrderModel, customer: Option<CustomerSummary>) -> StartedOrderSummary {
    StartedOrderSummary {
        id: order.id,
        order_number: order.order_number,
        plate_number: order.plate_number,
        customer,
        started_at: order.started_at,
        order_type: order.order_type,
        status: order.status,
    }
}

async fn open_order(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Json(request): Json<OpenOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.orders.open_order(branch_id, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.orders.get_order(branch_id, id).await?;
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state
        .orders
        .list_orders(branch_id, params.page(), params.per_page())
        .await?;
    Ok(Json(orders))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(open_order))
        .route("/", get(list_orders))
        .route("/started", get(search_started_orders))
        .route("/:id", get(get_order))
}
