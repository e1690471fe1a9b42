//! Pending-approver notification model.
//!
//! The engine only writes these rows; delivery (mail, SMS, push) is the
//! responsibility of an external collaborator that consumes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per (stage, approver) pair that became awaiting-action.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub instance_id: Uuid,
    pub stage_id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
