//! Delegation rule API handlers.

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::handlers::CompanyId;
use crate::services::delegation::{CreateDelegationRequest, CreateDelegationResponse};
use crate::services::DelegationService;

/// Create a delegation rule.
///
/// `POST /api/delegations`
///
/// # Request Body
///
/// ```json
/// {
///   "request_type": "EXPENSE",
///   "from_employee_id": "...",
///   "to_employee_id": "..."
/// }
/// ```
pub async fn create(
    State(service): State<DelegationService>,
    CompanyId(company_id): CompanyId,
    Json(request): Json<CreateDelegationRequest>,
) -> AppResult<(StatusCode, Json<CreateDelegationResponse>)> {
    let response = service.create_rule(company_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
