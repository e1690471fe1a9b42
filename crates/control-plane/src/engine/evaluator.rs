//! Quorum-rule evaluation.
//!
//! `evaluate` is re-run against the full decision set after every recorded
//! action; it never short-circuits on partial state, so the outcome is a
//! function of (rule, approver slots, decisions) alone.

use std::collections::HashMap;

use uuid::Uuid;

use crate::db::models::{ApprovalRule, Decision};

/// One approver binding as seen by the evaluator. `weight` is the value
/// resolved at definition time; `None` contributes nothing to a weighted
/// quorum.
#[derive(Debug, Clone, Copy)]
pub struct ApproverSlot {
    pub employee_id: Uuid,
    pub weight: Option<i64>,
}

/// A decision already recorded for this stage.
#[derive(Debug, Clone, Copy)]
pub struct RecordedDecision {
    pub approver_id: Uuid,
    pub decision: Decision,
}

/// Resolution of one stage under its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Quorum still attainable, not yet reached.
    Pending,
    Approved,
    Rejected,
}

/// Evaluate a stage's rule against the recorded decisions.
///
/// A stage is rejected as soon as its quorum becomes unattainable, not only
/// once every approver has acted: `anyN{1}` over three approvers survives
/// two rejections, while `all` fails on the first.
pub fn evaluate(
    rule: &ApprovalRule,
    approvers: &[ApproverSlot],
    decisions: &[RecordedDecision],
) -> StageOutcome {
    let by_approver: HashMap<Uuid, Decision> = decisions
        .iter()
        .map(|d| (d.approver_id, d.decision))
        .collect();

    match rule {
        ApprovalRule::All => {
            if approvers
                .iter()
                .any(|a| by_approver.get(&a.employee_id) == Some(&Decision::Rejected))
            {
                return StageOutcome::Rejected;
            }
            if approvers
                .iter()
                .all(|a| by_approver.get(&a.employee_id) == Some(&Decision::Approved))
            {
                return StageOutcome::Approved;
            }
            StageOutcome::Pending
        }
        ApprovalRule::AnyN { required } => {
            let required = *required as usize;
            let approved = approvers
                .iter()
                .filter(|a| by_approver.get(&a.employee_id) == Some(&Decision::Approved))
                .count();
            let undecided = approvers
                .iter()
                .filter(|a| !by_approver.contains_key(&a.employee_id))
                .count();

            if approved >= required {
                StageOutcome::Approved
            } else if approved + undecided < required {
                StageOutcome::Rejected
            } else {
                StageOutcome::Pending
            }
        }
        ApprovalRule::Weighted { threshold, .. } => {
            let achieved: i64 = approvers
                .iter()
                .filter(|a| by_approver.get(&a.employee_id) == Some(&Decision::Approved))
                .filter_map(|a| a.weight)
                .sum();
            let outstanding: i64 = approvers
                .iter()
                .filter(|a| !by_approver.contains_key(&a.employee_id))
                .filter_map(|a| a.weight)
                .sum();

            if achieved >= *threshold {
                StageOutcome::Approved
            } else if achieved + outstanding < *threshold {
                StageOutcome::Rejected
            } else {
                StageOutcome::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn slots(n: usize) -> Vec<ApproverSlot> {
        (0..n)
            .map(|_| ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: None,
            })
            .collect()
    }

    fn decided(slot: &ApproverSlot, decision: Decision) -> RecordedDecision {
        RecordedDecision {
            approver_id: slot.employee_id,
            decision,
        }
    }

    fn weighted(threshold: i64) -> ApprovalRule {
        ApprovalRule::Weighted {
            threshold,
            weights: HashMap::new(),
        }
    }

    #[test]
    fn test_all_requires_every_approval() {
        let approvers = slots(3);
        let rule = ApprovalRule::All;

        assert_eq!(evaluate(&rule, &approvers, &[]), StageOutcome::Pending);

        let two: Vec<_> = approvers[..2]
            .iter()
            .map(|a| decided(a, Decision::Approved))
            .collect();
        assert_eq!(evaluate(&rule, &approvers, &two), StageOutcome::Pending);

        let three: Vec<_> = approvers
            .iter()
            .map(|a| decided(a, Decision::Approved))
            .collect();
        assert_eq!(evaluate(&rule, &approvers, &three), StageOutcome::Approved);
    }

    #[test]
    fn test_all_fails_on_single_rejection() {
        let approvers = slots(3);
        let decisions = vec![
            decided(&approvers[0], Decision::Approved),
            decided(&approvers[1], Decision::Rejected),
        ];
        assert_eq!(
            evaluate(&ApprovalRule::All, &approvers, &decisions),
            StageOutcome::Rejected
        );
    }

    #[test]
    fn test_any_n_reaches_quorum() {
        let approvers = slots(3);
        let rule = ApprovalRule::AnyN { required: 2 };

        let one = vec![decided(&approvers[0], Decision::Approved)];
        assert_eq!(evaluate(&rule, &approvers, &one), StageOutcome::Pending);

        let two = vec![
            decided(&approvers[0], Decision::Approved),
            decided(&approvers[2], Decision::Approved),
        ];
        assert_eq!(evaluate(&rule, &approvers, &two), StageOutcome::Approved);
    }

    #[test]
    fn test_any_n_survives_rejection_while_attainable() {
        // anyN{1} over two approvers: one rejection leaves quorum reachable
        let approvers = slots(2);
        let rule = ApprovalRule::AnyN { required: 1 };

        let one = vec![decided(&approvers[0], Decision::Rejected)];
        assert_eq!(evaluate(&rule, &approvers, &one), StageOutcome::Pending);

        let both = vec![
            decided(&approvers[0], Decision::Rejected),
            decided(&approvers[1], Decision::Rejected),
        ];
        assert_eq!(evaluate(&rule, &approvers, &both), StageOutcome::Rejected);
    }

    #[test]
    fn test_any_n_rejects_when_unattainable() {
        let approvers = slots(3);
        let rule = ApprovalRule::AnyN { required: 3 };

        let decisions = vec![decided(&approvers[1], Decision::Rejected)];
        assert_eq!(
            evaluate(&rule, &approvers, &decisions),
            StageOutcome::Rejected
        );
    }

    #[test]
    fn test_weighted_threshold_reached() {
        let approvers = vec![
            ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: Some(6),
            },
            ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: Some(5),
            },
        ];

        let one = vec![decided(&approvers[0], Decision::Approved)];
        assert_eq!(
            evaluate(&weighted(10), &approvers, &one),
            StageOutcome::Pending
        );

        let both = vec![
            decided(&approvers[0], Decision::Approved),
            decided(&approvers[1], Decision::Approved),
        ];
        assert_eq!(
            evaluate(&weighted(10), &approvers, &both),
            StageOutcome::Approved
        );
    }

    #[test]
    fn test_weighted_rejects_when_threshold_unreachable() {
        // threshold 10, weights {6, 5}: approve(6) then reject(5) leaves
        // 6 < 10 with nothing outstanding
        let approvers = vec![
            ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: Some(6),
            },
            ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: Some(5),
            },
        ];
        let decisions = vec![
            decided(&approvers[0], Decision::Approved),
            decided(&approvers[1], Decision::Rejected),
        ];
        assert_eq!(
            evaluate(&weighted(10), &approvers, &decisions),
            StageOutcome::Rejected
        );
    }

    #[test]
    fn test_weighted_null_weight_contributes_zero() {
        let approvers = vec![
            ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: Some(10),
            },
            ApproverSlot {
                employee_id: Uuid::new_v4(),
                weight: None,
            },
        ];

        // The unweighted approver approving moves nothing
        let unweighted_only = vec![decided(&approvers[1], Decision::Approved)];
        assert_eq!(
            evaluate(&weighted(10), &approvers, &unweighted_only),
            StageOutcome::Pending
        );

        // Once the weighted approver rejects, only the unweighted one is
        // outstanding and the threshold is unreachable
        let weighted_rejects = vec![decided(&approvers[0], Decision::Rejected)];
        assert_eq!(
            evaluate(&weighted(10), &approvers, &weighted_rejects),
            StageOutcome::Rejected
        );
    }

    #[test]
    fn test_outcome_is_order_independent() {
        let approvers = slots(3);
        let rule = ApprovalRule::AnyN { required: 2 };
        let mut decisions = vec![
            decided(&approvers[0], Decision::Rejected),
            decided(&approvers[1], Decision::Approved),
            decided(&approvers[2], Decision::Approved),
        ];

        let forward = evaluate(&rule, &approvers, &decisions);
        decisions.reverse();
        let backward = evaluate(&rule, &approvers, &decisions);

        assert_eq!(forward, StageOutcome::Approved);
        assert_eq!(forward, backward);
    }
}
