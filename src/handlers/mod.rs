pub mod common;
pub mod customers;
pub mod health;
pub mod invoices;
pub mod orders;

use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the caller's branch, set by the upstream session layer.
pub const BRANCH_HEADER: &str = "x-branch-id";

/// Branch (tenant) scope of the current request.
///
/// Every lookup and update takes the branch as an explicit argument; this
/// extractor is the only place the ambient request context is consulted.
#[derive(Debug, Clone, Copy)]
pub struct BranchScope(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BranchScope
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(BRANCH_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!("Missing {} header", BRANCH_HEADER))
            })?;

        let branch_id = Uuid::parse_str(value).map_err(|_| {
            ServiceError::Unauthorized(format!("Invalid {} header", BRANCH_HEADER))
        })?;

        Ok(BranchScope(branch_id))
    }
}
