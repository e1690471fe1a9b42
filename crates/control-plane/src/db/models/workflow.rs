//! Workflow definition models.
//!
//! A workflow definition is a tenant-scoped template: ordered stages, each
//! carrying a quorum rule and a set of approver bindings. Definitions are
//! immutable once created; registering the same (tenant, type, name) again
//! allocates the next version.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Kind of domain request a workflow applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Attendance,
    Expense,
    Payroll,
    Program,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Attendance => "ATTENDANCE",
            RequestType::Expense => "EXPENSE",
            RequestType::Payroll => "PAYROLL",
            RequestType::Program => "PROGRAM",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "ATTENDANCE" => Ok(RequestType::Attendance),
            "EXPENSE" => Ok(RequestType::Expense),
            "PAYROLL" => Ok(RequestType::Payroll),
            "PROGRAM" => Ok(RequestType::Program),
            other => Err(AppError::Internal(format!(
                "Unknown request type in storage: {}",
                other
            ))),
        }
    }
}

/// Quorum rule for one stage, validated at definition time.
///
/// Closed tagged union; dispatched through the rule evaluator rather than
/// dynamic dispatch. The `weighted` map is keyed by approver display name on
/// the wire (legacy shape); names are resolved to stable employee ids once,
/// at definition time, and the weight is stored on the stage binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApprovalRule {
    /// Every bound approver must approve.
    #[serde(rename = "all")]
    All,
    /// At least `required` approvals needed.
    #[serde(rename = "anyN")]
    AnyN { required: u32 },
    /// Sum of approving weights must reach `threshold`.
    #[serde(rename = "weighted")]
    Weighted {
        threshold: i64,
        weights: HashMap<String, i64>,
    },
}

impl ApprovalRule {
    /// Validate the rule shape: `required`/`threshold` >= 1, weights >= 1.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            ApprovalRule::All => Ok(()),
            ApprovalRule::AnyN { required } => {
                if *required < 1 {
                    return Err(AppError::Validation(
                        "anyN rule requires 'required' >= 1".to_string(),
                    ));
                }
                Ok(())
            }
            ApprovalRule::Weighted { threshold, weights } => {
                if *threshold < 1 {
                    return Err(AppError::Validation(
                        "weighted rule requires 'threshold' >= 1".to_string(),
                    ));
                }
                if let Some((name, weight)) = weights.iter().find(|(_, w)| **w < 1) {
                    return Err(AppError::Validation(format!(
                        "weighted rule has non-positive weight {} for '{}'",
                        weight, name
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Workflow definition row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub department_id: Option<Uuid>,
    pub name: String,
    pub request_type: String,
    pub is_fully_parallel: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Stage row. `rule` is the serialized [`ApprovalRule`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub stage_order: i32,
    pub is_parallel: bool,
    pub rule: serde_json::Value,
}

impl StageRow {
    /// Deserialize the stored quorum rule.
    pub fn approval_rule(&self) -> AppResult<ApprovalRule> {
        serde_json::from_value(self.rule.clone()).map_err(|e| {
            AppError::Internal(format!("Malformed rule stored for stage {}: {}", self.id, e))
        })
    }
}

/// Approver binding for a stage. `weight` was resolved from the weighted
/// rule's name-keyed map at definition time; NULL means the approver cannot
/// contribute to a weighted quorum.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageApproverRow {
    pub id: Uuid,
    pub stage_id: Uuid,
    pub employee_id: Uuid,
    pub weight: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_tagged_serialization() {
        let rule = ApprovalRule::AnyN { required: 2 };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"type\":\"anyN\""));
        assert!(json.contains("\"required\":2"));

        let back: ApprovalRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_all_rule_ignores_extra_fields() {
        // Legacy payloads carry a 'required' field alongside type=all
        let rule: ApprovalRule = serde_json::from_str(r#"{"type":"all","required":3}"#).unwrap();
        assert_eq!(rule, ApprovalRule::All);
    }

    #[test]
    fn test_weighted_rule_deserialization() {
        let json = r#"{"type":"weighted","threshold":10,"weights":{"Alice":6,"Bob":5}}"#;
        let rule: ApprovalRule = serde_json::from_str(json).unwrap();
        match rule {
            ApprovalRule::Weighted { threshold, weights } => {
                assert_eq!(threshold, 10);
                assert_eq!(weights.get("Alice"), Some(&6));
                assert_eq!(weights.get("Bob"), Some(&5));
            }
            other => panic!("unexpected rule: {:?}", other),
        }
    }

    #[test]
    fn test_rule_validation() {
        assert!(ApprovalRule::All.validate().is_ok());
        assert!(ApprovalRule::AnyN { required: 1 }.validate().is_ok());
        assert!(ApprovalRule::AnyN { required: 0 }.validate().is_err());

        let mut weights = HashMap::new();
        weights.insert("Alice".to_string(), 0);
        assert!(ApprovalRule::Weighted {
            threshold: 5,
            weights
        }
        .validate()
        .is_err());

        assert!(ApprovalRule::Weighted {
            threshold: 0,
            weights: HashMap::new()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_request_type_roundtrip() {
        for rt in [
            RequestType::Attendance,
            RequestType::Expense,
            RequestType::Payroll,
            RequestType::Program,
        ] {
            assert_eq!(RequestType::parse(rt.as_str()).unwrap(), rt);
        }
        assert!(RequestType::parse("LEAVE").is_err());
    }
}
