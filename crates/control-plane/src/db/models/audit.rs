//! Audit log model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kinds of audit events the instance engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    InstanceCreated,
    ActionRecorded,
    StageApproved,
    StageRejected,
    InstanceApproved,
    InstanceRejected,
    Resubmitted,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::InstanceCreated => "instance_created",
            AuditKind::ActionRecorded => "action_recorded",
            AuditKind::StageApproved => "stage_approved",
            AuditKind::StageRejected => "stage_rejected",
            AuditKind::InstanceApproved => "instance_approved",
            AuditKind::InstanceRejected => "instance_rejected",
            AuditKind::Resubmitted => "resubmitted",
        }
    }
}

/// One append-only audit row. The bigserial `id` carries the exact order in
/// which the engine performed its mutations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub instance_id: Uuid,
    pub company_id: Uuid,
    pub kind: String,
    pub actor_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_snake_case() {
        assert_eq!(AuditKind::InstanceCreated.as_str(), "instance_created");
        assert_eq!(AuditKind::Resubmitted.as_str(), "resubmitted");
        let json = serde_json::to_string(&AuditKind::StageRejected).unwrap();
        assert_eq!(json, "\"stage_rejected\"");
    }
}
