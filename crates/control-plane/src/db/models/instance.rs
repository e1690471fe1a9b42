//! Approval instance runtime models.
//!
//! An instance is one execution of a workflow definition against one
//! request. Instances and their stage statuses are mutated only by the
//! instance engine and become immutable once status leaves PENDING.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Status shared by instances and stage statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            other => Err(AppError::Internal(format!(
                "Unknown approval status in storage: {}",
                other
            ))),
        }
    }
}

/// An approver's recorded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "APPROVED",
            Decision::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "APPROVED" => Ok(Decision::Approved),
            "REJECTED" => Ok(Decision::Rejected),
            other => Err(AppError::Internal(format!(
                "Unknown decision in storage: {}",
                other
            ))),
        }
    }
}

/// Approval instance row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InstanceRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub workflow_id: Uuid,
    pub request_id: Uuid,
    pub status: String,
    pub version: i32,
    pub parent_instance_id: Option<Uuid>,
    pub resubmission_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl InstanceRow {
    pub fn approval_status(&self) -> AppResult<ApprovalStatus> {
        ApprovalStatus::parse(&self.status)
    }
}

/// Per-instance, per-stage runtime row. Eagerly materialized for every
/// stage at instance creation; active when PENDING with `activated_at` set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageStatusRow {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub stage_id: Uuid,
    pub status: String,
    pub activated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StageStatusRow {
    pub fn approval_status(&self) -> AppResult<ApprovalStatus> {
        ApprovalStatus::parse(&self.status)
    }

    /// Whether the stage currently accepts approver actions.
    pub fn is_active(&self) -> bool {
        self.status == "PENDING" && self.activated_at.is_some()
    }
}

/// A recorded approver decision. `approver_id` is the bound roster slot;
/// `acted_by` names the actual actor (a delegate when they differ).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DecisionRow {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub stage_id: Uuid,
    pub approver_id: Uuid,
    pub acted_by: Uuid,
    pub decision: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ApprovalStatus::parse("DELEGATED").is_err());
    }

    #[test]
    fn test_decision_serde_shape() {
        let json = serde_json::to_string(&Decision::Approved).unwrap();
        assert_eq!(json, "\"APPROVED\"");
        let back: Decision = serde_json::from_str("\"REJECTED\"").unwrap();
        assert_eq!(back, Decision::Rejected);
    }

    #[test]
    fn test_stage_is_active() {
        let mut row = StageStatusRow {
            id: Uuid::new_v4(),
            instance_id: Uuid::new_v4(),
            stage_id: Uuid::new_v4(),
            status: "PENDING".to_string(),
            activated_at: None,
            resolved_at: None,
        };
        assert!(!row.is_active());

        row.activated_at = Some(Utc::now());
        assert!(row.is_active());

        row.status = "APPROVED".to_string();
        assert!(!row.is_active());
    }
}
