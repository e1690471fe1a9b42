//! Delegation rule model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant-scoped redirection of pending approvals for a request type from
/// one employee to another. Consulted when determining who may act; never
/// mutates the stage approver roster.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DelegationRule {
    pub id: Uuid,
    pub company_id: Uuid,
    pub request_type: String,
    pub from_employee_id: Uuid,
    pub to_employee_id: Uuid,
    pub created_at: DateTime<Utc>,
}
