//! Audit trail and notification API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::db::models::{AuditEntry, Notification};
use crate::error::AppResult;
use crate::handlers::CompanyId;
use crate::services::AuditService;

/// Audit entries for an instance, oldest first.
///
/// `GET /api/instances/{instance_id}/audit`
pub async fn list_for_instance(
    State(service): State<AuditService>,
    CompanyId(company_id): CompanyId,
    Path(instance_id): Path<Uuid>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    let entries = service.list_for_instance(company_id, instance_id).await?;
    Ok(Json(entries))
}

/// Notifications queued for an instance.
///
/// `GET /api/instances/{instance_id}/notifications`
pub async fn list_notifications(
    State(service): State<AuditService>,
    CompanyId(company_id): CompanyId,
    Path(instance_id): Path<Uuid>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = service.list_notifications(company_id, instance_id).await?;
    Ok(Json(notifications))
}
