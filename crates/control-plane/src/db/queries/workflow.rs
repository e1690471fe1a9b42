//! Workflow definition queries.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::{StageApproverRow, StageRow, WorkflowRow};
use crate::error::AppResult;

/// Next version for a (tenant, request type, name) triple. Definitions are
/// immutable, so re-registering allocates a new version.
pub async fn next_version<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    request_type: &str,
    name: &str,
) -> AppResult<i32> {
    let row: (i32,) = sqlx::query_as(
        r#"
        SELECT COALESCE(MAX(version), 0) + 1
        FROM signoff.approval_workflow
        WHERE company_id = $1 AND request_type = $2 AND name = $3
        "#,
    )
    .bind(company_id)
    .bind(request_type)
    .bind(name)
    .fetch_one(ex)
    .await?;

    Ok(row.0)
}

/// Insert a workflow definition.
#[allow(clippy::too_many_arguments)]
pub async fn insert_workflow<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    company_id: Uuid,
    department_id: Option<Uuid>,
    name: &str,
    request_type: &str,
    is_fully_parallel: bool,
    version: i32,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.approval_workflow (
            id, company_id, department_id, name, request_type, is_fully_parallel, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(company_id)
    .bind(department_id)
    .bind(name)
    .bind(request_type)
    .bind(is_fully_parallel)
    .bind(version)
    .execute(ex)
    .await?;

    Ok(())
}

/// Insert a stage of a workflow.
pub async fn insert_stage<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    workflow_id: Uuid,
    stage_order: i32,
    is_parallel: bool,
    rule: &serde_json::Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.approval_stage (id, workflow_id, stage_order, is_parallel, rule)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(workflow_id)
    .bind(stage_order)
    .bind(is_parallel)
    .bind(rule)
    .execute(ex)
    .await?;

    Ok(())
}

/// Bind an approver to a stage.
pub async fn insert_stage_approver<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    stage_id: Uuid,
    employee_id: Uuid,
    weight: Option<i64>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.stage_approver (id, stage_id, employee_id, weight)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(stage_id)
    .bind(employee_id)
    .bind(weight)
    .execute(ex)
    .await?;

    Ok(())
}

/// Get a workflow by id, scoped to the tenant.
pub async fn get_workflow<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    workflow_id: Uuid,
) -> AppResult<Option<WorkflowRow>> {
    let workflow = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, company_id, department_id, name, request_type, is_fully_parallel,
               version, created_at
        FROM signoff.approval_workflow
        WHERE company_id = $1 AND id = $2
        "#,
    )
    .bind(company_id)
    .bind(workflow_id)
    .fetch_optional(ex)
    .await?;

    Ok(workflow)
}

/// List a tenant's workflows, optionally filtered by request type.
pub async fn list_workflows<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    request_type: Option<&str>,
) -> AppResult<Vec<WorkflowRow>> {
    let workflows = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, company_id, department_id, name, request_type, is_fully_parallel,
               version, created_at
        FROM signoff.approval_workflow
        WHERE company_id = $1 AND ($2::TEXT IS NULL OR request_type = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(company_id)
    .bind(request_type)
    .fetch_all(ex)
    .await?;

    Ok(workflows)
}

/// Latest-version workflow for a request type (used when binding a newly
/// submitted request).
pub async fn latest_workflow_for_type<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    request_type: &str,
) -> AppResult<Option<WorkflowRow>> {
    let workflow = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, company_id, department_id, name, request_type, is_fully_parallel,
               version, created_at
        FROM signoff.approval_workflow
        WHERE company_id = $1 AND request_type = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(company_id)
    .bind(request_type)
    .fetch_optional(ex)
    .await?;

    Ok(workflow)
}

/// Stages of a workflow, ordered by stage order.
pub async fn get_stages<'e>(ex: impl PgExecutor<'e>, workflow_id: Uuid) -> AppResult<Vec<StageRow>> {
    let stages = sqlx::query_as::<_, StageRow>(
        r#"
        SELECT id, workflow_id, stage_order, is_parallel, rule
        FROM signoff.approval_stage
        WHERE workflow_id = $1
        ORDER BY stage_order ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(ex)
    .await?;

    Ok(stages)
}

/// A single stage by id.
pub async fn get_stage<'e>(ex: impl PgExecutor<'e>, stage_id: Uuid) -> AppResult<Option<StageRow>> {
    let stage = sqlx::query_as::<_, StageRow>(
        r#"
        SELECT id, workflow_id, stage_order, is_parallel, rule
        FROM signoff.approval_stage
        WHERE id = $1
        "#,
    )
    .bind(stage_id)
    .fetch_optional(ex)
    .await?;

    Ok(stage)
}

/// Approver bindings for one stage.
pub async fn get_stage_approvers<'e>(
    ex: impl PgExecutor<'e>,
    stage_id: Uuid,
) -> AppResult<Vec<StageApproverRow>> {
    let approvers = sqlx::query_as::<_, StageApproverRow>(
        r#"
        SELECT id, stage_id, employee_id, weight
        FROM signoff.stage_approver
        WHERE stage_id = $1
        "#,
    )
    .bind(stage_id)
    .fetch_all(ex)
    .await?;

    Ok(approvers)
}

/// Approver bindings for every stage of a workflow in one round trip.
pub async fn get_workflow_approvers<'e>(
    ex: impl PgExecutor<'e>,
    workflow_id: Uuid,
) -> AppResult<Vec<StageApproverRow>> {
    let approvers = sqlx::query_as::<_, StageApproverRow>(
        r#"
        SELECT sa.id, sa.stage_id, sa.employee_id, sa.weight
        FROM signoff.stage_approver sa
        JOIN signoff.approval_stage s ON s.id = sa.stage_id
        WHERE s.workflow_id = $1
        ORDER BY s.stage_order ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(ex)
    .await?;

    Ok(approvers)
}
