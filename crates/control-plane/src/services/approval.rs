//! Approval instance service.
//!
//! Owns the instance lifecycle: binding a submitted request to the latest
//! workflow definition, materializing per-stage runtime state, recording
//! approver actions and applying the evaluator/planner verdicts. Every
//! mutating operation runs in a single transaction and takes a row lock on
//! the instance, so concurrent actions against the same instance serialize;
//! unique constraints close the remaining races across instances.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{
    ApprovalStatus, AuditKind, Decision, DecisionRow, DelegationRule, InstanceRow, RequestType,
    StageApproverRow, WorkflowRow,
};
use crate::db::queries::{
    audit as audit_queries, delegation as delegation_queries, instance as queries,
    notification as notification_queries, request as request_queries, roster,
    workflow as workflow_queries,
};
use crate::db::DbPool;
use crate::engine::{self, ApproverSlot, RecordedDecision, StageOutcome, StageSnapshot};
use crate::error::{AppError, AppResult};
use crate::services::workflow::ApproverDetail;

/// Request to submit a domain object for approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequestRequest {
    pub request_type: RequestType,
    /// The domain object under approval (expense report, attendance
    /// correction, ...), owned by the calling module.
    pub module_id: Uuid,
    pub requested_by: Uuid,
}

/// Response after submitting a request: the stored request id plus the
/// freshly materialized instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequestResponse {
    pub request_id: Uuid,
    pub instance: InstanceDetail,
}

/// Request to start an approval instance for an existing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    pub request_id: Uuid,
    /// Pin a specific definition; defaults to the latest for the request's
    /// type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Uuid>,
}

/// An approver's action on an active stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActionRequest {
    pub actor_id: Uuid,
    pub stage_id: Uuid,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Runtime view of one stage within an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStageDetail {
    pub stage_id: Uuid,
    pub stage_order: i32,
    pub rule: serde_json::Value,
    pub status: String,
    pub active: bool,
    pub approvers: Vec<ApproverDetail>,
    pub decisions: Vec<DecisionRow>,
}

/// Full runtime view of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub id: Uuid,
    pub request_id: Uuid,
    pub workflow_id: Uuid,
    pub status: String,
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resubmission_reason: Option<String>,
    pub stages: Vec<InstanceStageDetail>,
}

/// Service for approval instance operations.
#[derive(Clone)]
pub struct ApprovalService {
    pool: DbPool,
}

impl ApprovalService {
    /// Create a new approval service.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a request and start its approval instance in one call.
    pub async fn submit_request(
        &self,
        company_id: Uuid,
        request: SubmitRequestRequest,
    ) -> AppResult<SubmitRequestResponse> {
        if !roster::employee_exists(&self.pool, company_id, request.requested_by).await? {
            return Err(AppError::Validation(format!(
                "Unknown requester: {}",
                request.requested_by
            )));
        }

        let request_type = request.request_type.as_str();
        let workflow =
            workflow_queries::latest_workflow_for_type(&self.pool, company_id, request_type)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "No workflow definition registered for request type {}",
                        request_type
                    ))
                })?;

        let request_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        request_queries::insert_request(
            &mut *tx,
            request_id,
            company_id,
            request_type,
            request.module_id,
            request.requested_by,
        )
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(e, "An identical request was already submitted")
        })?;

        let instance_id = self
            .materialize(
                &mut tx,
                company_id,
                &workflow,
                request_id,
                request.requested_by,
                1,
                None,
                None,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            company_id = %company_id,
            request_id = %request_id,
            instance_id = %instance_id,
            request_type,
            "Submitted request and started approval instance"
        );

        let instance = self.get_instance_details(company_id, instance_id).await?;
        Ok(SubmitRequestResponse {
            request_id,
            instance,
        })
    }

    /// Start an approval instance for an already-registered request.
    pub async fn create_instance(
        &self,
        company_id: Uuid,
        request: CreateInstanceRequest,
    ) -> AppResult<InstanceDetail> {
        let stored = request_queries::get_request(&self.pool, company_id, request.request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Request not found: {}", request.request_id))
            })?;

        let workflow = match request.workflow_id {
            Some(workflow_id) => {
                let workflow = workflow_queries::get_workflow(&self.pool, company_id, workflow_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Workflow not found: {}", workflow_id))
                    })?;
                if workflow.request_type != stored.request_type {
                    return Err(AppError::Validation(format!(
                        "Workflow covers {} requests, not {}",
                        workflow.request_type, stored.request_type
                    )));
                }
                workflow
            }
            None => workflow_queries::latest_workflow_for_type(
                &self.pool,
                company_id,
                &stored.request_type,
            )
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No workflow definition registered for request type {}",
                    stored.request_type
                ))
            })?,
        };

        if queries::pending_instance_for_request(&self.pool, company_id, stored.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Request already has a pending approval instance".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let instance_id = self
            .materialize(
                &mut tx,
                company_id,
                &workflow,
                stored.id,
                stored.requested_by,
                1,
                None,
                None,
            )
            .await?;
        tx.commit().await?;

        self.get_instance_details(company_id, instance_id).await
    }

    /// Record one approver's decision and apply the consequences. Returns
    /// the instance view reflecting the action.
    pub async fn record_action(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
        action: RecordActionRequest,
    ) -> AppResult<InstanceDetail> {
        let mut tx = self.pool.begin().await?;

        let instance = queries::lock_instance(&mut *tx, company_id, instance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instance not found: {}", instance_id)))?;
        ensure_actionable(&instance)?;

        let stage_status = queries::get_stage_status(&mut *tx, instance_id, action.stage_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Stage {} is not part of instance {}",
                    action.stage_id, instance_id
                ))
            })?;
        if !stage_status.is_active() {
            return Err(AppError::NotFound(format!(
                "No active stage {} on instance {}",
                action.stage_id, instance_id
            )));
        }

        let request = request_queries::get_request(&mut *tx, company_id, instance.request_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Instance {} has no request row", instance_id))
            })?;

        let bindings = workflow_queries::get_stage_approvers(&mut *tx, action.stage_id).await?;
        let approver_ids: Vec<Uuid> = bindings.iter().map(|b| b.employee_id).collect();
        let delegations = delegation_queries::delegates_for(
            &mut *tx,
            company_id,
            &request.request_type,
            &approver_ids,
        )
        .await?;

        let slot = resolve_slot(action.actor_id, &bindings, &delegations).ok_or_else(|| {
            AppError::Forbidden(format!(
                "Employee {} is not an approver (or delegate) on this stage",
                action.actor_id
            ))
        })?;

        queries::insert_decision(
            &mut *tx,
            Uuid::new_v4(),
            instance_id,
            action.stage_id,
            slot,
            action.actor_id,
            action.decision.as_str(),
            action.comment.as_deref(),
        )
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(e, "A decision was already recorded for this approver")
        })?;

        audit_queries::insert_entry(
            &mut *tx,
            company_id,
            instance_id,
            Some(action.actor_id),
            AuditKind::ActionRecorded.as_str(),
            &serde_json::json!({
                "stage_id": action.stage_id,
                "decision": action.decision.as_str(),
                "approver_id": slot,
                "acted_by": action.actor_id,
                "comment": action.comment,
            }),
        )
        .await?;

        // Re-evaluate the stage against the full decision set.
        let stage = workflow_queries::get_stage(&mut *tx, action.stage_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Stage row missing: {}", action.stage_id))
            })?;
        let rule = stage.approval_rule()?;
        let slots: Vec<ApproverSlot> = bindings
            .iter()
            .map(|b| ApproverSlot {
                employee_id: b.employee_id,
                weight: b.weight,
            })
            .collect();
        let decisions = queries::list_stage_decisions(&mut *tx, instance_id, action.stage_id)
            .await?
            .iter()
            .map(|d| {
                Ok(RecordedDecision {
                    approver_id: d.approver_id,
                    decision: Decision::parse(&d.decision)?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        let outcome = engine::evaluate(&rule, &slots, &decisions);

        let now = Utc::now();
        let mut activated_stage_ids = Vec::new();
        let mut instance_status = ApprovalStatus::Pending;

        if outcome != StageOutcome::Pending {
            let (stage_result, stage_audit) = match outcome {
                StageOutcome::Approved => (ApprovalStatus::Approved, AuditKind::StageApproved),
                StageOutcome::Rejected => (ApprovalStatus::Rejected, AuditKind::StageRejected),
                StageOutcome::Pending => unreachable!(),
            };
            queries::update_stage_status(
                &mut *tx,
                instance_id,
                action.stage_id,
                stage_result.as_str(),
                Some(now),
            )
            .await?;
            audit_queries::insert_entry(
                &mut *tx,
                company_id,
                instance_id,
                Some(action.actor_id),
                stage_audit.as_str(),
                &serde_json::json!({
                    "stage_id": action.stage_id,
                    "stage_order": stage.stage_order,
                }),
            )
            .await?;

            let workflow =
                workflow_queries::get_workflow(&mut *tx, company_id, instance.workflow_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "Workflow row missing: {}",
                            instance.workflow_id
                        ))
                    })?;
            let snapshots = self.load_snapshots(&mut tx, instance_id).await?;
            let plan = engine::plan(
                &snapshots,
                action.stage_id,
                outcome,
                workflow.is_fully_parallel,
            );

            for stage_id in &plan.activate {
                queries::activate_stage(&mut *tx, instance_id, *stage_id, now).await?;
                self.notify_stage_approvers(
                    &mut tx,
                    company_id,
                    instance_id,
                    *stage_id,
                    &request.request_type,
                )
                .await?;
                activated_stage_ids.push(*stage_id);
            }

            if let Some(resolved) = plan.instance_status {
                queries::update_instance_status(
                    &mut *tx,
                    instance_id,
                    resolved.as_str(),
                    Some(now),
                )
                .await?;
                let kind = match resolved {
                    ApprovalStatus::Approved => AuditKind::InstanceApproved,
                    _ => AuditKind::InstanceRejected,
                };
                audit_queries::insert_entry(
                    &mut *tx,
                    company_id,
                    instance_id,
                    Some(action.actor_id),
                    kind.as_str(),
                    &serde_json::json!({}),
                )
                .await?;
                instance_status = resolved;
            }
        }

        tx.commit().await?;

        let stage_result = match outcome {
            StageOutcome::Pending => ApprovalStatus::Pending,
            StageOutcome::Approved => ApprovalStatus::Approved,
            StageOutcome::Rejected => ApprovalStatus::Rejected,
        };

        tracing::info!(
            company_id = %company_id,
            instance_id = %instance_id,
            stage_id = %action.stage_id,
            actor_id = %action.actor_id,
            decision = action.decision.as_str(),
            stage_status = stage_result.as_str(),
            instance_status = instance_status.as_str(),
            activated = activated_stage_ids.len(),
            "Recorded approval action"
        );

        self.get_instance_details(company_id, instance_id).await
    }

    /// Full runtime view of an instance: stages in order with approver
    /// bindings and recorded decisions.
    pub async fn get_instance_details(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
    ) -> AppResult<InstanceDetail> {
        let instance = queries::get_instance(&self.pool, company_id, instance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instance not found: {}", instance_id)))?;

        let stages = workflow_queries::get_stages(&self.pool, instance.workflow_id).await?;
        let statuses = queries::list_stage_statuses(&self.pool, instance_id).await?;
        let bindings =
            workflow_queries::get_workflow_approvers(&self.pool, instance.workflow_id).await?;
        let decisions = queries::list_instance_decisions(&self.pool, instance_id).await?;

        let employee_ids: Vec<Uuid> = bindings.iter().map(|b| b.employee_id).collect();
        let employees = roster::resolve_employees(&self.pool, company_id, &employee_ids).await?;
        let names: std::collections::HashMap<Uuid, String> = employees
            .into_iter()
            .map(|e| (e.id, e.display_name))
            .collect();

        let mut stage_details = Vec::with_capacity(stages.len());
        for stage in &stages {
            let status = statuses
                .iter()
                .find(|s| s.stage_id == stage.id)
                .ok_or_else(|| {
                    AppError::Internal(format!("Stage status missing for stage {}", stage.id))
                })?;
            let approvers = bindings
                .iter()
                .filter(|b| b.stage_id == stage.id)
                .map(|b| ApproverDetail {
                    employee_id: b.employee_id,
                    display_name: names.get(&b.employee_id).cloned().unwrap_or_default(),
                    weight: b.weight,
                })
                .collect();
            let stage_decisions = decisions
                .iter()
                .filter(|d| d.stage_id == stage.id)
                .cloned()
                .collect();

            stage_details.push(InstanceStageDetail {
                stage_id: stage.id,
                stage_order: stage.stage_order,
                rule: stage.rule.clone(),
                status: status.status.clone(),
                active: status.is_active(),
                approvers,
                decisions: stage_decisions,
            });
        }

        Ok(InstanceDetail {
            id: instance.id,
            request_id: instance.request_id,
            workflow_id: instance.workflow_id,
            status: instance.status,
            version: instance.version,
            parent_instance_id: instance.parent_instance_id,
            resubmission_reason: instance.resubmission_reason,
            stages: stage_details,
        })
    }

    pub async fn get_instance(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
    ) -> AppResult<InstanceRow> {
        queries::get_instance(&self.pool, company_id, instance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instance not found: {}", instance_id)))
    }

    /// Materialize an instance inside the caller's transaction: the
    /// instance row, a stage status per stage (initial stages activated),
    /// the creation audit entry and notifications for active stages.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn materialize(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        company_id: Uuid,
        workflow: &WorkflowRow,
        request_id: Uuid,
        requested_by: Uuid,
        version: i32,
        parent_instance_id: Option<Uuid>,
        resubmission_reason: Option<&str>,
    ) -> AppResult<Uuid> {
        let stages = workflow_queries::get_stages(&mut **tx, workflow.id).await?;
        if stages.is_empty() {
            return Err(AppError::Internal(format!(
                "Workflow {} has no stages",
                workflow.id
            )));
        }

        let instance_id = Uuid::new_v4();
        queries::insert_instance(
            &mut **tx,
            instance_id,
            company_id,
            request_id,
            workflow.id,
            version,
            parent_instance_id,
            resubmission_reason,
        )
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(e, "Request already has a pending approval instance")
        })?;

        let snapshots: Vec<StageSnapshot> = stages
            .iter()
            .map(|s| StageSnapshot {
                stage_id: s.id,
                stage_order: s.stage_order,
                status: ApprovalStatus::Pending,
                active: false,
            })
            .collect();
        let initial = engine::initial_active(&snapshots, workflow.is_fully_parallel);

        let now = Utc::now();
        for stage in &stages {
            let activated_at = initial.contains(&stage.id).then_some(now);
            queries::insert_stage_status(&mut **tx, Uuid::new_v4(), instance_id, stage.id, activated_at)
                .await?;
        }

        audit_queries::insert_entry(
            &mut **tx,
            company_id,
            instance_id,
            Some(requested_by),
            AuditKind::InstanceCreated.as_str(),
            &serde_json::json!({
                "workflow_id": workflow.id,
                "workflow_version": workflow.version,
                "request_id": request_id,
                "parent_instance_id": parent_instance_id,
            }),
        )
        .await?;

        for stage_id in &initial {
            self.notify_stage_approvers(
                tx,
                company_id,
                instance_id,
                *stage_id,
                &workflow.request_type,
            )
            .await?;
        }

        Ok(instance_id)
    }

    async fn load_snapshots(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        instance_id: Uuid,
    ) -> AppResult<Vec<StageSnapshot>> {
        let statuses = queries::list_stage_statuses(&mut **tx, instance_id).await?;
        let mut snapshots = Vec::with_capacity(statuses.len());
        for (index, status) in statuses.iter().enumerate() {
            snapshots.push(StageSnapshot {
                stage_id: status.stage_id,
                // list_stage_statuses orders by stage order; the planner
                // only compares orders relatively.
                stage_order: index as i32,
                status: status.approval_status()?,
                active: status.is_active(),
            });
        }
        Ok(snapshots)
    }

    /// Queue a notification for every approver of a stage, redirected to
    /// their delegate when a delegation rule covers them.
    async fn notify_stage_approvers(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        company_id: Uuid,
        instance_id: Uuid,
        stage_id: Uuid,
        request_type: &str,
    ) -> AppResult<()> {
        let bindings = workflow_queries::get_stage_approvers(&mut **tx, stage_id).await?;
        let approver_ids: Vec<Uuid> = bindings.iter().map(|b| b.employee_id).collect();
        let delegations =
            delegation_queries::delegates_for(&mut **tx, company_id, request_type, &approver_ids)
                .await?;

        let message = format!("Approval requested for a {} request", request_type);
        for binding in &bindings {
            let recipient = delegations
                .iter()
                .find(|d| d.from_employee_id == binding.employee_id)
                .map(|d| d.to_employee_id)
                .unwrap_or(binding.employee_id);
            notification_queries::insert_notification(
                &mut **tx,
                instance_id,
                stage_id,
                recipient,
                &message,
            )
            .await?;
        }
        Ok(())
    }
}

/// A resolved instance no longer accepts decisions. Callers see it the same
/// way as an instance that does not exist, like a stage without a live
/// stage status.
fn ensure_actionable(instance: &InstanceRow) -> AppResult<()> {
    if instance.approval_status()? != ApprovalStatus::Pending {
        return Err(AppError::NotFound(format!(
            "No pending instance: {} (instance is {})",
            instance.id, instance.status
        )));
    }
    Ok(())
}

/// Resolve which roster slot an actor's decision lands on: the actor's own
/// binding when they are a stage approver, otherwise the first bound
/// approver who delegated this request type to them.
fn resolve_slot(
    actor_id: Uuid,
    bindings: &[StageApproverRow],
    delegations: &[DelegationRule],
) -> Option<Uuid> {
    if bindings.iter().any(|b| b.employee_id == actor_id) {
        return Some(actor_id);
    }
    bindings
        .iter()
        .find(|b| {
            delegations
                .iter()
                .any(|d| d.from_employee_id == b.employee_id && d.to_employee_id == actor_id)
        })
        .map(|b| b.employee_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn binding(employee_id: Uuid) -> StageApproverRow {
        StageApproverRow {
            id: Uuid::new_v4(),
            stage_id: Uuid::new_v4(),
            employee_id,
            weight: None,
        }
    }

    fn delegation(from: Uuid, to: Uuid) -> DelegationRule {
        DelegationRule {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            request_type: "EXPENSE".to_string(),
            from_employee_id: from,
            to_employee_id: to,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_slot_direct_binding() {
        let approver = Uuid::new_v4();
        let bindings = vec![binding(approver)];
        assert_eq!(resolve_slot(approver, &bindings, &[]), Some(approver));
    }

    #[test]
    fn test_resolve_slot_via_delegation() {
        let approver = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let bindings = vec![binding(approver)];
        let delegations = vec![delegation(approver, delegate)];
        assert_eq!(
            resolve_slot(delegate, &bindings, &delegations),
            Some(approver)
        );
    }

    #[test]
    fn test_resolve_slot_prefers_own_binding_over_delegation() {
        // An actor who is both a bound approver and someone's delegate
        // spends their own slot first.
        let actor = Uuid::new_v4();
        let other = Uuid::new_v4();
        let bindings = vec![binding(other), binding(actor)];
        let delegations = vec![delegation(other, actor)];
        assert_eq!(resolve_slot(actor, &bindings, &delegations), Some(actor));
    }

    #[test]
    fn test_resolve_slot_stranger_has_no_standing() {
        let bindings = vec![binding(Uuid::new_v4())];
        assert_eq!(resolve_slot(Uuid::new_v4(), &bindings, &[]), None);
    }

    fn instance_row(status: &str) -> InstanceRow {
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
            resolved_at: None,
        }
    }

    #[test]
    fn test_pending_instance_is_actionable() {
        assert!(ensure_actionable(&instance_row("PENDING")).is_ok());
    }

    #[test]
    fn test_resolved_instance_reads_as_missing() {
        // A decision against an APPROVED or REJECTED instance is a 404, the
        // instance is no longer an actionable target.
        for status in ["APPROVED", "REJECTED"] {
            match ensure_actionable(&instance_row(status)) {
                Err(AppError::NotFound(_)) => {}
                other => panic!("expected NotFound for {}, got {:?}", status, other),
            }
        }
    }
}
