//! Workflow definition service.
//!
//! Definitions are validated and persisted atomically; once stored they are
//! immutable. Registering the same (tenant, type, name) again allocates the
//! next version, and existing instances keep running against the version
//! they were created from.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{ApprovalRule, RequestType, StageApproverRow, StageRow, WorkflowRow};
use crate::db::queries::{roster, workflow as queries};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Request to register a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub request_type: RequestType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    /// When true, every stage activates at instance creation.
    #[serde(default)]
    pub is_fully_parallel: bool,
    pub stages: Vec<StageSpec>,
}

/// One stage of a definition request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub stage_order: i32,
    /// Approvers within the stage may act in any order regardless of this
    /// flag; it is advisory for clients rendering the stage.
    #[serde(default)]
    pub is_parallel: bool,
    pub rule: ApprovalRule,
    pub approver_ids: Vec<Uuid>,
}

/// A stored approver binding with its resolved roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverDetail {
    pub employee_id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

/// A stored stage with its approvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDetail {
    pub id: Uuid,
    pub stage_order: i32,
    pub is_parallel: bool,
    pub rule: ApprovalRule,
    pub approvers: Vec<ApproverDetail>,
}

/// Full view of a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDetail {
    pub id: Uuid,
    pub name: String,
    pub request_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    pub is_fully_parallel: bool,
    pub version: i32,
    pub stages: Vec<StageDetail>,
}

/// Service for workflow definition operations.
#[derive(Clone)]
pub struct WorkflowService {
    pool: DbPool,
}

impl WorkflowService {
    /// Create a new workflow service.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Validate and persist a workflow definition.
    pub async fn create(
        &self,
        company_id: Uuid,
        request: CreateWorkflowRequest,
    ) -> AppResult<WorkflowDetail> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Workflow name must not be empty".to_string(),
            ));
        }
        if request.stages.is_empty() {
            return Err(AppError::Validation(
                "Workflow must define at least one stage".to_string(),
            ));
        }

        let mut seen_orders = HashSet::new();
        let mut duplicate_orders: Vec<i32> = Vec::new();
        for stage in &request.stages {
            if !seen_orders.insert(stage.stage_order) {
                duplicate_orders.push(stage.stage_order);
            }
            if stage.approver_ids.is_empty() {
                return Err(AppError::Validation(format!(
                    "Stage {} has no approvers",
                    stage.stage_order
                )));
            }
            let unique: HashSet<&Uuid> = stage.approver_ids.iter().collect();
            if unique.len() != stage.approver_ids.len() {
                return Err(AppError::Validation(format!(
                    "Stage {} binds the same approver more than once",
                    stage.stage_order
                )));
            }
            stage.rule.validate()?;
            if let ApprovalRule::AnyN { required } = stage.rule {
                if required as usize > stage.approver_ids.len() {
                    return Err(AppError::Validation(format!(
                        "Stage {} requires {} approvals but binds only {} approvers",
                        stage.stage_order,
                        required,
                        stage.approver_ids.len()
                    )));
                }
            }
        }
        if !duplicate_orders.is_empty() {
            duplicate_orders.sort_unstable();
            duplicate_orders.dedup();
            let offenders: Vec<String> =
                duplicate_orders.iter().map(|o| o.to_string()).collect();
            return Err(AppError::Validation(format!(
                "Duplicate stage order(s): {}",
                offenders.join(", ")
            )));
        }

        // Resolve every approver in one round trip; unknown ids fail the
        // whole definition.
        let all_ids: Vec<Uuid> = {
            let set: HashSet<Uuid> = request
                .stages
                .iter()
                .flat_map(|s| s.approver_ids.iter().copied())
                .collect();
            set.into_iter().collect()
        };
        let employees = roster::resolve_employees(&self.pool, company_id, &all_ids).await?;
        if employees.len() != all_ids.len() {
            let known: HashSet<Uuid> = employees.iter().map(|e| e.id).collect();
            let missing: Vec<String> = all_ids
                .iter()
                .filter(|id| !known.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(AppError::Validation(format!(
                "Unknown approver(s): {}",
                missing.join(", ")
            )));
        }
        let names_by_id: HashMap<Uuid, &str> = employees
            .iter()
            .map(|e| (e.id, e.display_name.as_str()))
            .collect();

        let request_type = request.request_type.as_str();
        let version =
            queries::next_version(&self.pool, company_id, request_type, &request.name).await?;

        let workflow_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        queries::insert_workflow(
            &mut *tx,
            workflow_id,
            company_id,
            request.department_id,
            &request.name,
            request_type,
            request.is_fully_parallel,
            version,
        )
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(e, "A definition with this version already exists")
        })?;

        let mut stages = Vec::with_capacity(request.stages.len());
        for spec in &request.stages {
            let stage_id = Uuid::new_v4();
            let rule_json = serde_json::to_value(&spec.rule)?;
            queries::insert_stage(
                &mut *tx,
                stage_id,
                workflow_id,
                spec.stage_order,
                spec.is_parallel,
                &rule_json,
            )
            .await?;

            let mut approvers = Vec::with_capacity(spec.approver_ids.len());
            for employee_id in &spec.approver_ids {
                let weight = stage_weight(&spec.rule, names_by_id.get(employee_id).copied());
                queries::insert_stage_approver(
                    &mut *tx,
                    Uuid::new_v4(),
                    stage_id,
                    *employee_id,
                    weight,
                )
                .await?;
                approvers.push(ApproverDetail {
                    employee_id: *employee_id,
                    display_name: names_by_id
                        .get(employee_id)
                        .copied()
                        .unwrap_or_default()
                        .to_string(),
                    weight,
                });
            }

            stages.push(StageDetail {
                id: stage_id,
                stage_order: spec.stage_order,
                is_parallel: spec.is_parallel,
                rule: spec.rule.clone(),
                approvers,
            });
        }

        tx.commit().await?;
        stages.sort_by_key(|s| s.stage_order);

        tracing::info!(
            company_id = %company_id,
            workflow_id = %workflow_id,
            request_type,
            version,
            "Registered workflow definition"
        );

        Ok(WorkflowDetail {
            id: workflow_id,
            name: request.name,
            request_type: request_type.to_string(),
            department_id: request.department_id,
            is_fully_parallel: request.is_fully_parallel,
            version,
            stages,
        })
    }

    /// Fetch one definition with stages and approver bindings.
    pub async fn get(&self, company_id: Uuid, workflow_id: Uuid) -> AppResult<WorkflowDetail> {
        let workflow = queries::get_workflow(&self.pool, company_id, workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Workflow not found: {}", workflow_id)))?;

        let stages = queries::get_stages(&self.pool, workflow_id).await?;
        let bindings = queries::get_workflow_approvers(&self.pool, workflow_id).await?;
        let employee_ids: Vec<Uuid> = bindings.iter().map(|b| b.employee_id).collect();
        let employees = roster::resolve_employees(&self.pool, company_id, &employee_ids).await?;
        let names_by_id: HashMap<Uuid, String> = employees
            .into_iter()
            .map(|e| (e.id, e.display_name))
            .collect();

        self.assemble_detail(workflow, stages, bindings, &names_by_id)
    }

    /// List a tenant's definitions (headers only, newest first).
    pub async fn list(
        &self,
        company_id: Uuid,
        request_type: Option<RequestType>,
    ) -> AppResult<Vec<WorkflowRow>> {
        queries::list_workflows(
            &self.pool,
            company_id,
            request_type.map(|rt| rt.as_str()),
        )
        .await
    }

    fn assemble_detail(
        &self,
        workflow: WorkflowRow,
        stages: Vec<StageRow>,
        bindings: Vec<StageApproverRow>,
        names_by_id: &HashMap<Uuid, String>,
    ) -> AppResult<WorkflowDetail> {
        let mut by_stage: HashMap<Uuid, Vec<ApproverDetail>> = HashMap::new();
        for binding in bindings {
            by_stage
                .entry(binding.stage_id)
                .or_default()
                .push(ApproverDetail {
                    employee_id: binding.employee_id,
                    display_name: names_by_id
                        .get(&binding.employee_id)
                        .cloned()
                        .unwrap_or_default(),
                    weight: binding.weight,
                });
        }

        let mut details = Vec::with_capacity(stages.len());
        for stage in stages {
            let rule = stage.approval_rule()?;
            details.push(StageDetail {
                id: stage.id,
                stage_order: stage.stage_order,
                is_parallel: stage.is_parallel,
                rule,
                approvers: by_stage.remove(&stage.id).unwrap_or_default(),
            });
        }

        Ok(WorkflowDetail {
            id: workflow.id,
            name: workflow.name,
            request_type: workflow.request_type,
            department_id: workflow.department_id,
            is_fully_parallel: workflow.is_fully_parallel,
            version: workflow.version,
            stages: details,
        })
    }
}

/// Weight stored on the binding: weighted rules look the approver's display
/// name up in the rule's map, all other rules store NULL.
fn stage_weight(rule: &ApprovalRule, display_name: Option<&str>) -> Option<i64> {
    match rule {
        ApprovalRule::Weighted { weights, .. } => {
            display_name.and_then(|name| weights.get(name).copied())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_stage_weight_resolution() {
        let mut weights = HashMap::new();
        weights.insert("Alice".to_string(), 6);
        let rule = ApprovalRule::Weighted {
            threshold: 10,
            weights,
        };

        assert_eq!(stage_weight(&rule, Some("Alice")), Some(6));
        assert_eq!(stage_weight(&rule, Some("Bob")), None);
        assert_eq!(stage_weight(&ApprovalRule::All, Some("Alice")), None);
    }

    #[test]
    fn test_create_request_defaults() {
        let json = r#"{
            "name": "Expense approval",
            "request_type": "EXPENSE",
            "stages": [
                {
                    "stage_order": 1,
                    "rule": {"type": "anyN", "required": 1},
                    "approver_ids": ["7f3c8a52-9f1e-4f7a-8f44-1f9f0a2d6c11"]
                }
            ]
        }"#;
        let request: CreateWorkflowRequest = serde_json::from_str(json).unwrap();
        assert!(!request.is_fully_parallel);
        assert!(!request.stages[0].is_parallel);
        assert_eq!(request.request_type, RequestType::Expense);
    }
}
