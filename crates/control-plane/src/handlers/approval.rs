//! Approval instance API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::CompanyId;
use crate::services::approval::{
    CreateInstanceRequest, InstanceDetail, RecordActionRequest, SubmitRequestRequest,
    SubmitRequestResponse,
};
use crate::services::resubmission::ResubmitRequest;
use crate::services::{ApprovalService, ResubmissionService};

/// Submit a domain object for approval.
///
/// Registers the request and starts an instance against the latest
/// workflow definition for its type in one transaction.
///
/// `POST /api/requests`
///
/// # Request Body
///
/// ```json
/// {
///   "request_type": "EXPENSE",
///   "module_id": "...",
///   "requested_by": "..."
/// }
/// ```
pub async fn submit_request(
    State(service): State<ApprovalService>,
    CompanyId(company_id): CompanyId,
    Json(request): Json<SubmitRequestRequest>,
) -> AppResult<(StatusCode, Json<SubmitRequestResponse>)> {
    let response = service.submit_request(company_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Start an approval instance for an already-registered request.
///
/// `POST /api/instances`
///
/// # Request Body
///
/// ```json
/// {
///   "request_id": "...",
///   "workflow_id": "..."  // optional, defaults to latest
/// }
/// ```
pub async fn create_instance(
    State(service): State<ApprovalService>,
    CompanyId(company_id): CompanyId,
    Json(request): Json<CreateInstanceRequest>,
) -> AppResult<(StatusCode, Json<InstanceDetail>)> {
    let response = service.create_instance(company_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get the runtime view of an instance.
///
/// `GET /api/instances/{instance_id}`
pub async fn get_instance(
    State(service): State<ApprovalService>,
    CompanyId(company_id): CompanyId,
    Path(instance_id): Path<Uuid>,
) -> AppResult<Json<InstanceDetail>> {
    let detail = service.get_instance_details(company_id, instance_id).await?;
    Ok(Json(detail))
}

/// Record an approver's decision on an active stage.
///
/// `POST /api/instances/{instance_id}/actions`
///
/// # Request Body
///
/// ```json
/// {
///   "actor_id": "...",
///   "stage_id": "...",
///   "decision": "APPROVED",
///   "comment": "Looks fine"
/// }
/// ```
///
/// # Response
///
/// The instance view reflecting the action: per-stage statuses, recorded
/// decisions, and the instance status.
pub async fn record_action(
    State(service): State<ApprovalService>,
    CompanyId(company_id): CompanyId,
    Path(instance_id): Path<Uuid>,
    Json(request): Json<RecordActionRequest>,
) -> AppResult<Json<InstanceDetail>> {
    let response = service.record_action(company_id, instance_id, request).await?;
    Ok(Json(response))
}

/// Resubmit a rejected instance.
///
/// `POST /api/instances/{instance_id}/resubmit`
///
/// # Request Body
///
/// ```json
/// {
///   "requested_by": "...",
///   "reason": "Receipts attached"
/// }
/// ```
pub async fn resubmit(
    State(service): State<ResubmissionService>,
    CompanyId(company_id): CompanyId,
    Path(instance_id): Path<Uuid>,
    Json(request): Json<ResubmitRequest>,
) -> AppResult<(StatusCode, Json<InstanceDetail>)> {
    let response = service.resubmit(company_id, instance_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
