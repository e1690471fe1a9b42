//! Workflow definition API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{RequestType, WorkflowRow};
use crate::error::AppResult;
use crate::handlers::CompanyId;
use crate::services::workflow::{CreateWorkflowRequest, WorkflowDetail};
use crate::services::WorkflowService;

/// Register a workflow definition.
///
/// `POST /api/workflows`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Expense approval",
///   "request_type": "EXPENSE",
///   "stages": [
///     {
///       "stage_order": 1,
///       "rule": {"type": "anyN", "required": 1},
///       "approver_ids": ["..."]
///     },
///     {
///       "stage_order": 2,
///       "rule": {"type": "all"},
///       "approver_ids": ["..."]
///     }
///   ]
/// }
/// ```
///
/// # Response
///
/// The stored definition with its allocated version and resolved
/// approver bindings.
pub async fn create(
    State(service): State<WorkflowService>,
    CompanyId(company_id): CompanyId,
    Json(request): Json<CreateWorkflowRequest>,
) -> AppResult<(StatusCode, Json<WorkflowDetail>)> {
    let response = service.create(company_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Query parameters for listing workflows.
#[derive(Debug, Deserialize)]
pub struct ListWorkflowsQuery {
    pub request_type: Option<RequestType>,
}

/// List workflow definitions for the tenant.
///
/// `GET /api/workflows?request_type=EXPENSE`
pub async fn list(
    State(service): State<WorkflowService>,
    CompanyId(company_id): CompanyId,
    Query(query): Query<ListWorkflowsQuery>,
) -> AppResult<Json<Vec<WorkflowRow>>> {
    let workflows = service.list(company_id, query.request_type).await?;
    Ok(Json(workflows))
}

/// Get one workflow definition with stages and approvers.
///
/// `GET /api/workflows/{workflow_id}`
pub async fn get(
    State(service): State<WorkflowService>,
    CompanyId(company_id): CompanyId,
    Path(workflow_id): Path<Uuid>,
) -> AppResult<Json<WorkflowDetail>> {
    let workflow = service.get(company_id, workflow_id).await?;
    Ok(Json(workflow))
}
