//! Stage transition planning.
//!
//! Given a snapshot of every stage's runtime status and the outcome of the
//! stage that just resolved, `plan` decides which stages to activate next
//! and whether the instance itself resolves. Sequential workflows walk the
//! stage order; fully-parallel workflows activate everything up front and
//! resolve once all stages agree.

use uuid::Uuid;

use crate::db::models::ApprovalStatus;
use crate::engine::evaluator::StageOutcome;

/// Runtime view of one stage for planning purposes.
#[derive(Debug, Clone, Copy)]
pub struct StageSnapshot {
    pub stage_id: Uuid,
    pub stage_order: i32,
    pub status: ApprovalStatus,
    pub active: bool,
}

/// What the service must apply after a stage resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Stages to activate (empty except on sequential advancement).
    pub activate: Vec<Uuid>,
    /// Terminal instance status, if the instance resolves.
    pub instance_status: Option<ApprovalStatus>,
}

/// Stage ids active at instance creation: every stage when fully parallel,
/// otherwise the single lowest-ordered stage.
pub fn initial_active(stages: &[StageSnapshot], fully_parallel: bool) -> Vec<Uuid> {
    if fully_parallel {
        return stages.iter().map(|s| s.stage_id).collect();
    }
    stages
        .iter()
        .min_by_key(|s| s.stage_order)
        .map(|s| vec![s.stage_id])
        .unwrap_or_default()
}

/// Plan the follow-on transitions after `resolved_stage` resolves with
/// `outcome`. The snapshot must already reflect the resolution.
pub fn plan(
    stages: &[StageSnapshot],
    resolved_stage: Uuid,
    outcome: StageOutcome,
    fully_parallel: bool,
) -> TransitionPlan {
    match outcome {
        StageOutcome::Pending => TransitionPlan {
            activate: Vec::new(),
            instance_status: None,
        },
        // Any stage rejection rejects the whole instance; remaining stages
        // are abandoned as-is.
        StageOutcome::Rejected => TransitionPlan {
            activate: Vec::new(),
            instance_status: Some(ApprovalStatus::Rejected),
        },
        StageOutcome::Approved => {
            let all_approved = stages
                .iter()
                .all(|s| s.status == ApprovalStatus::Approved);
            if all_approved {
                return TransitionPlan {
                    activate: Vec::new(),
                    instance_status: Some(ApprovalStatus::Approved),
                };
            }
            if fully_parallel {
                // Everything is already active; wait for the rest.
                return TransitionPlan {
                    activate: Vec::new(),
                    instance_status: None,
                };
            }

            let resolved_order = stages
                .iter()
                .find(|s| s.stage_id == resolved_stage)
                .map(|s| s.stage_order);
            let next = resolved_order.and_then(|order| {
                stages
                    .iter()
                    .filter(|s| s.stage_order > order && s.status == ApprovalStatus::Pending)
                    .min_by_key(|s| s.stage_order)
            });

            TransitionPlan {
                activate: next.map(|s| s.stage_id).into_iter().collect(),
                instance_status: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(order: i32, status: ApprovalStatus, active: bool) -> StageSnapshot {
        StageSnapshot {
            stage_id: Uuid::new_v4(),
            stage_order: order,
            status,
            active,
        }
    }

    #[test]
    fn test_initial_active_sequential_is_first_stage() {
        let stages = vec![
            snapshot(2, ApprovalStatus::Pending, false),
            snapshot(1, ApprovalStatus::Pending, false),
            snapshot(3, ApprovalStatus::Pending, false),
        ];
        assert_eq!(initial_active(&stages, false), vec![stages[1].stage_id]);
    }

    #[test]
    fn test_initial_active_parallel_is_every_stage() {
        let stages = vec![
            snapshot(1, ApprovalStatus::Pending, false),
            snapshot(2, ApprovalStatus::Pending, false),
        ];
        assert_eq!(initial_active(&stages, true).len(), 2);
    }

    #[test]
    fn test_sequential_approval_activates_next_stage() {
        let stages = vec![
            snapshot(1, ApprovalStatus::Approved, true),
            snapshot(2, ApprovalStatus::Pending, false),
            snapshot(3, ApprovalStatus::Pending, false),
        ];
        let plan = plan(&stages, stages[0].stage_id, StageOutcome::Approved, false);
        assert_eq!(plan.activate, vec![stages[1].stage_id]);
        assert_eq!(plan.instance_status, None);
    }

    #[test]
    fn test_last_stage_approval_resolves_instance() {
        let stages = vec![
            snapshot(1, ApprovalStatus::Approved, true),
            snapshot(2, ApprovalStatus::Approved, true),
        ];
        let plan = plan(&stages, stages[1].stage_id, StageOutcome::Approved, false);
        assert!(plan.activate.is_empty());
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Approved));
    }

    #[test]
    fn test_rejection_rejects_instance_without_activation() {
        let stages = vec![
            snapshot(1, ApprovalStatus::Approved, true),
            snapshot(2, ApprovalStatus::Rejected, true),
            snapshot(3, ApprovalStatus::Pending, false),
        ];
        let plan = plan(&stages, stages[1].stage_id, StageOutcome::Rejected, false);
        assert!(plan.activate.is_empty());
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Rejected));
    }

    #[test]
    fn test_parallel_approval_waits_for_siblings() {
        let stages = vec![
            snapshot(1, ApprovalStatus::Approved, true),
            snapshot(2, ApprovalStatus::Pending, true),
        ];
        let plan = plan(&stages, stages[0].stage_id, StageOutcome::Approved, true);
        assert!(plan.activate.is_empty());
        assert_eq!(plan.instance_status, None);
    }

    #[test]
    fn test_parallel_final_approval_resolves_instance() {
        let stages = vec![
            snapshot(1, ApprovalStatus::Approved, true),
            snapshot(2, ApprovalStatus::Approved, true),
        ];
        let plan = plan(&stages, stages[1].stage_id, StageOutcome::Approved, true);
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Approved));
    }

    #[test]
    fn test_pending_outcome_plans_nothing() {
        let stages = vec![snapshot(1, ApprovalStatus::Pending, true)];
        let plan = plan(&stages, stages[0].stage_id, StageOutcome::Pending, false);
        assert!(plan.activate.is_empty());
        assert_eq!(plan.instance_status, None);
    }

    #[test]
    fn test_single_stage_workflow_resolves_on_approval() {
        let stages = vec![snapshot(1, ApprovalStatus::Approved, true)];
        let plan = plan(&stages, stages[0].stage_id, StageOutcome::Approved, false);
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Approved));
    }
}
