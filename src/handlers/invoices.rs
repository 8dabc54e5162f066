use super::{common::PaginationParams, BranchScope};
use crate::{errors::ServiceError, services::invoices::CreateInvoiceRequest, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct InvoiceListParams {
    pub order_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl InvoiceListParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// POST / — the invoice-creation submission: either links the explicitly
/// selected started order or opens a new one, in one transaction.
async fn create_invoice(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state.invoices.create_invoice(branch_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_invoice(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.invoices.get_invoice(branch_id, id).await?;
    Ok(Json(invoice))
}

async fn list_invoices(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Query(params): Query<InvoiceListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = params.pagination();
    let invoices = state
        .invoices
        .list_invoices(
            branch_id,
            params.order_id,
            pagination.page(),
            pagination.per_page(),
        )
        .await?;
    Ok(Json(invoices))
}

async fn issue_invoice(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.invoices.issue_invoice(branch_id, id).await?;
    Ok(Json(invoice))
}

async fn cancel_invoice(
    State(state): State<AppState>,
    BranchScope(branch_id): BranchScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.invoices.cancel_invoice(branch_id, id).await?;
    Ok(Json(invoice))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_invoice))
        .route("/", get(list_invoices))
        .route("/:id", get(get_invoice))
        .route("/:id/issue", post(issue_invoice))
        .route("/:id/cancel", post(cancel_invoice))
}
