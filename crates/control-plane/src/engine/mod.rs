//! Pure instance-engine logic.
//!
//! The evaluator scores one stage's decisions against its quorum rule; the
//! transition planner turns a stage outcome into the set of stage
//! activations and the instance-level status change. Both are pure over
//! in-memory snapshots so the decision logic is testable without a
//! database; the approval service loads state, calls them, and applies the
//! result inside its transaction.

pub mod evaluator;
pub mod transition;

pub use evaluator::{evaluate, ApproverSlot, RecordedDecision, StageOutcome};
pub use transition::{initial_active, plan, StageSnapshot, TransitionPlan};

#[cfg(test)]
mod tests {
    //! Walks full instance lifecycles through evaluator and planner over
    //! in-memory state, mirroring what the approval service persists.

    use uuid::Uuid;

    use super::*;
    use crate::db::models::{ApprovalRule, ApprovalStatus, Decision};

    struct Stage {
        snapshot: StageSnapshot,
        rule: ApprovalRule,
        approvers: Vec<ApproverSlot>,
        decisions: Vec<RecordedDecision>,
    }

    fn stage(order: i32, rule: ApprovalRule, approvers: Vec<ApproverSlot>) -> Stage {
        Stage {
            snapshot: StageSnapshot {
                stage_id: Uuid::new_v4(),
                stage_order: order,
                status: ApprovalStatus::Pending,
                active: false,
            },
            rule,
            approvers,
            decisions: Vec::new(),
        }
    }

    fn slot() -> ApproverSlot {
        ApproverSlot {
            employee_id: Uuid::new_v4(),
            weight: None,
        }
    }

    /// Record a decision on one stage and apply the resulting plan, the way
    /// the approval service does inside its transaction.
    fn act(
        stages: &mut [Stage],
        index: usize,
        approver: Uuid,
        decision: Decision,
        fully_parallel: bool,
    ) -> TransitionPlan {
        stages[index].decisions.push(RecordedDecision {
            approver_id: approver,
            decision,
        });
        let outcome = evaluate(
            &stages[index].rule,
            &stages[index].approvers,
            &stages[index].decisions,
        );
        match outcome {
            StageOutcome::Approved => stages[index].snapshot.status = ApprovalStatus::Approved,
            StageOutcome::Rejected => stages[index].snapshot.status = ApprovalStatus::Rejected,
            StageOutcome::Pending => {}
        }
        let snapshots: Vec<StageSnapshot> = stages.iter().map(|s| s.snapshot).collect();
        let plan = plan(
            &snapshots,
            stages[index].snapshot.stage_id,
            outcome,
            fully_parallel,
        );
        for activated in &plan.activate {
            if let Some(s) = stages.iter_mut().find(|s| s.snapshot.stage_id == *activated) {
                s.snapshot.active = true;
            }
        }
        plan
    }

    fn two_stage_workflow() -> (Vec<Stage>, ApproverSlot, ApproverSlot, ApproverSlot) {
        let (a, b, c) = (slot(), slot(), slot());
        let mut stages = vec![
            stage(1, ApprovalRule::AnyN { required: 1 }, vec![a, b]),
            stage(2, ApprovalRule::All, vec![c]),
        ];
        let initial = initial_active(
            &stages.iter().map(|s| s.snapshot).collect::<Vec<_>>(),
            false,
        );
        assert_eq!(initial, vec![stages[0].snapshot.stage_id]);
        stages[0].snapshot.active = true;
        (stages, a, b, c)
    }

    #[test]
    fn test_sequential_approval_to_resolution() {
        let (mut stages, a, _b, c) = two_stage_workflow();

        // A approves stage 1: stage approved, stage 2 activates, instance
        // still pending.
        let plan = act(&mut stages, 0, a.employee_id, Decision::Approved, false);
        assert_eq!(stages[0].snapshot.status, ApprovalStatus::Approved);
        assert_eq!(plan.activate, vec![stages[1].snapshot.stage_id]);
        assert_eq!(plan.instance_status, None);
        assert!(stages[1].snapshot.active);

        // C approves stage 2: instance approved.
        let plan = act(&mut stages, 1, c.employee_id, Decision::Approved, false);
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Approved));
    }

    #[test]
    fn test_second_stage_rejection_rejects_instance() {
        let (mut stages, a, _b, c) = two_stage_workflow();

        act(&mut stages, 0, a.employee_id, Decision::Approved, false);
        let plan = act(&mut stages, 1, c.employee_id, Decision::Rejected, false);

        assert_eq!(stages[1].snapshot.status, ApprovalStatus::Rejected);
        assert!(plan.activate.is_empty());
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Rejected));
    }

    #[test]
    fn test_rerun_after_rejection_starts_from_first_stage() {
        let (mut stages, a, _b, c) = two_stage_workflow();

        act(&mut stages, 0, a.employee_id, Decision::Approved, false);
        let plan = act(&mut stages, 1, c.employee_id, Decision::Rejected, false);
        assert_eq!(plan.instance_status, Some(ApprovalStatus::Rejected));

        // Resubmission re-materializes the stage set from scratch: every
        // stage pending again, only the lowest-order one active, regardless
        // of how far the rejected run had advanced.
        let rerun: Vec<StageSnapshot> = stages
            .iter()
            .map(|s| StageSnapshot {
                status: ApprovalStatus::Pending,
                active: false,
                ..s.snapshot
            })
            .collect();
        let initial = initial_active(&rerun, false);
        assert_eq!(initial, vec![rerun[0].stage_id]);
    }

    #[test]
    fn test_any_n_rejection_does_not_resolve_stage_early() {
        let (mut stages, _a, b, _c) = two_stage_workflow();

        // B rejects stage 1; anyN{1} over two approvers stays pending.
        let plan = act(&mut stages, 0, b.employee_id, Decision::Rejected, false);
        assert_eq!(stages[0].snapshot.status, ApprovalStatus::Pending);
        assert!(plan.activate.is_empty());
        assert_eq!(plan.instance_status, None);
    }
}
