//! Resubmission service.
//!
//! A rejected instance can be resubmitted exactly once by its original
//! requester, producing a child instance that starts the same workflow
//! version from the beginning. Parent and child are linked, giving each
//! request a resubmission chain instead of mutable retry state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{ApprovalStatus, AuditKind, InstanceRow};
use crate::db::queries::{
    audit as audit_queries, instance as queries, request as request_queries,
    workflow as workflow_queries,
};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::approval::{ApprovalService, InstanceDetail};

/// Request to resubmit a rejected instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResubmitRequest {
    pub requested_by: Uuid,
    pub reason: String,
}


/// Service for resubmission chain operations.
#[derive(Clone)]
pub struct ResubmissionService {
    pool: DbPool,
    approvals: ApprovalService,
}

impl ResubmissionService {
    /// Create a new resubmission service.
    pub fn new(pool: DbPool, approvals: ApprovalService) -> Self {
        Self { pool, approvals }
    }

    /// Resubmit a rejected instance as a fresh child instance. Returns the
    /// child's runtime view.
    pub async fn resubmit(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
        request: ResubmitRequest,
    ) -> AppResult<InstanceDetail> {
        let mut tx = self.pool.begin().await?;

        let parent = queries::lock_instance(&mut *tx, company_id, instance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instance not found: {}", instance_id)))?;
        let stored = request_queries::get_request(&mut *tx, company_id, parent.request_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Instance {} has no request row", instance_id))
            })?;
        let has_child = queries::child_of(&mut *tx, parent.id).await?.is_some();

        ensure_resubmittable(
            &parent,
            stored.requested_by,
            request.requested_by,
            has_child,
            &request.reason,
        )?;

        // Child runs the same workflow version the parent was bound to,
        // even if a newer definition exists by now.
        let workflow = workflow_queries::get_workflow(&mut *tx, company_id, parent.workflow_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Workflow row missing: {}", parent.workflow_id))
            })?;

        let child_version = parent.version + 1;
        let child_id = self
            .approvals
            .materialize(
                &mut tx,
                company_id,
                &workflow,
                parent.request_id,
                stored.requested_by,
                child_version,
                Some(parent.id),
                Some(request.reason.as_str()),
            )
            .await
            .map_err(|e| match e {
                // The one-child unique constraint lost a race with another
                // resubmit; report it the same way as the pre-check.
                AppError::Conflict(_) => {
                    AppError::Conflict("Instance was already resubmitted".to_string())
                }
                other => other,
            })?;

        // One entry on each trail, so neither side's audit log dead-ends
        // at the rejection.
        let (child_details, parent_details) =
            chain_audit_details(parent.id, child_id, &request.reason);
        audit_queries::insert_entry(
            &mut *tx,
            company_id,
            child_id,
            Some(request.requested_by),
            AuditKind::Resubmitted.as_str(),
            &child_details,
        )
        .await?;
        audit_queries::insert_entry(
            &mut *tx,
            company_id,
            parent.id,
            Some(request.requested_by),
            AuditKind::Resubmitted.as_str(),
            &parent_details,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            company_id = %company_id,
            parent_instance_id = %parent.id,
            child_instance_id = %child_id,
            version = child_version,
            "Resubmitted rejected instance"
        );

        self.approvals.get_instance_details(company_id, child_id).await
    }
}

/// Precondition checks against the locked parent row. One retry per
/// rejection: the parent must be REJECTED, retried by its original
/// requester, without an existing child, and the attempt must say what
/// changed.
fn ensure_resubmittable(
    parent: &InstanceRow,
    original_requester: Uuid,
    requested_by: Uuid,
    has_child: bool,
    reason: &str,
) -> AppResult<()> {
    if reason.trim().is_empty() {
        return Err(AppError::Validation(
            "Resubmission reason must not be empty".to_string(),
        ));
    }
    if parent.approval_status()? != ApprovalStatus::Rejected {
        return Err(AppError::Conflict(format!(
            "Only rejected instances can be resubmitted (instance is {})",
            parent.status
        )));
    }
    if requested_by != original_requester {
        return Err(AppError::Forbidden(
            "Only the original requester may resubmit".to_string(),
        ));
    }
    if has_child {
        return Err(AppError::Conflict(
            "Instance was already resubmitted".to_string(),
        ));
    }
    Ok(())
}

/// Audit payloads linking the chain in both directions: the child's entry
/// names its parent, the parent's entry names the child.
fn chain_audit_details(
    parent_id: Uuid,
    child_id: Uuid,
    reason: &str,
) -> (serde_json::Value, serde_json::Value) {
    (
        serde_json::json!({
            "parent_instance_id": parent_id,
            "reason": reason,
        }),
        serde_json::json!({
            "child_instance_id": child_id,
            "reason": reason,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn parent_row(status: &str) -> InstanceRow {
        InstanceRow {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            status: status.to_string(),
            version: 1,
            parent_instance_id: None,
            resubmission_reason: None,
            created_at: Utc::now(),
            resolved_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_resubmit_requires_rejected_parent() {
        let requester = Uuid::new_v4();
        for status in ["PENDING", "APPROVED"] {
            let parent = parent_row(status);
            match ensure_resubmittable(&parent, requester, requester, false, "fixed receipts") {
                Err(AppError::Conflict(_)) => {}
                other => panic!("expected Conflict for {}, got {:?}", status, other),
            }
        }
    }

    #[test]
    fn test_resubmit_requires_original_requester() {
        let parent = parent_row("REJECTED");
        let result = ensure_resubmittable(
            &parent,
            Uuid::new_v4(),
            Uuid::new_v4(),
            false,
            "fixed receipts",
        );
        match result {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_resubmit_only_once_per_instance() {
        let requester = Uuid::new_v4();
        let parent = parent_row("REJECTED");
        match ensure_resubmittable(&parent, requester, requester, true, "fixed receipts") {
            Err(AppError::Conflict(_)) => {}
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_resubmit_rejects_blank_reason() {
        let requester = Uuid::new_v4();
        let parent = parent_row("REJECTED");
        match ensure_resubmittable(&parent, requester, requester, false, "   ") {
            Err(AppError::Validation(_)) => {}
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_resubmit_preconditions_pass_for_rejected_parent() {
        let requester = Uuid::new_v4();
        let parent = parent_row("REJECTED");
        assert!(ensure_resubmittable(&parent, requester, requester, false, "fixed receipts").is_ok());
    }

    #[test]
    fn test_chain_audit_links_both_directions() {
        let parent_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let (child_details, parent_details) =
            chain_audit_details(parent_id, child_id, "fixed receipts");

        assert_eq!(
            child_details["parent_instance_id"],
            serde_json::json!(parent_id)
        );
        assert_eq!(
            parent_details["child_instance_id"],
            serde_json::json!(child_id)
        );
        assert_eq!(child_details["reason"], parent_details["reason"]);
    }
}
