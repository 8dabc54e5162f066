use super::{common::PaginationParams, BranchScope};
use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

async fn get_customer(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.customers.get_customer(branch_id, id).await?;
    Ok(Json(customer))
}

async fn list_customers(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let customers = state
        .customers
        .list_customers(branch_id, params.page(), params.per_page())
        .await?;
    Ok(Json(customers))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/:id", get(get_customer))
}
