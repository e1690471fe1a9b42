//! Approval instance, stage status and decision queries.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::{DecisionRow, InstanceRow, StageStatusRow};
use crate::error::AppResult;

const INSTANCE_COLUMNS: &str = r#"
    id, company_id, request_id, workflow_id, status, version,
    parent_instance_id, resubmission_reason, created_at, resolved_at
"#;

#[allow(clippy::too_many_arguments)]
pub async fn insert_instance<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    company_id: Uuid,
    request_id: Uuid,
    workflow_id: Uuid,
    version: i32,
    parent_instance_id: Option<Uuid>,
    resubmission_reason: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.approval_instance (
            id, company_id, request_id, workflow_id, status, version,
            parent_instance_id, resubmission_reason
        )
        VALUES ($1, $2, $3, $4, 'PENDING', $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(company_id)
    .bind(request_id)
    .bind(workflow_id)
    .bind(version)
    .bind(parent_instance_id)
    .bind(resubmission_reason)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn get_instance<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    instance_id: Uuid,
) -> AppResult<Option<InstanceRow>> {
    let instance = sqlx::query_as::<_, InstanceRow>(&format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM signoff.approval_instance
        WHERE company_id = $1 AND id = $2
        "#
    ))
    .bind(company_id)
    .bind(instance_id)
    .fetch_optional(ex)
    .await?;

    Ok(instance)
}

/// Lock the instance row for the duration of the surrounding transaction.
/// Serializes concurrent `record_action` calls against the same instance.
pub async fn lock_instance<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    instance_id: Uuid,
) -> AppResult<Option<InstanceRow>> {
    let instance = sqlx::query_as::<_, InstanceRow>(&format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM signoff.approval_instance
        WHERE company_id = $1 AND id = $2
        FOR UPDATE
        "#
    ))
    .bind(company_id)
    .bind(instance_id)
    .fetch_optional(ex)
    .await?;

    Ok(instance)
}

/// The still-pending instance for a request, if one exists. The partial
/// unique index guarantees at most one.
pub async fn pending_instance_for_request<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    request_id: Uuid,
) -> AppResult<Option<InstanceRow>> {
    let instance = sqlx::query_as::<_, InstanceRow>(&format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM signoff.approval_instance
        WHERE company_id = $1 AND request_id = $2 AND status = 'PENDING'
        "#
    ))
    .bind(company_id)
    .bind(request_id)
    .fetch_optional(ex)
    .await?;

    Ok(instance)
}

pub async fn child_of<'e>(
    ex: impl PgExecutor<'e>,
    parent_instance_id: Uuid,
) -> AppResult<Option<InstanceRow>> {
    let instance = sqlx::query_as::<_, InstanceRow>(&format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM signoff.approval_instance
        WHERE parent_instance_id = $1
        "#
    ))
    .bind(parent_instance_id)
    .fetch_optional(ex)
    .await?;

    Ok(instance)
}

pub async fn update_instance_status<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
    status: &str,
    resolved_at: Option<DateTime<Utc>>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE signoff.approval_instance
        SET status = $2, resolved_at = $3
        WHERE id = $1
        "#,
    )
    .bind(instance_id)
    .bind(status)
    .bind(resolved_at)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn insert_stage_status<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    instance_id: Uuid,
    stage_id: Uuid,
    activated_at: Option<DateTime<Utc>>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.stage_status (id, instance_id, stage_id, status, activated_at)
        VALUES ($1, $2, $3, 'PENDING', $4)
        "#,
    )
    .bind(id)
    .bind(instance_id)
    .bind(stage_id)
    .bind(activated_at)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn get_stage_status<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
    stage_id: Uuid,
) -> AppResult<Option<StageStatusRow>> {
    let status = sqlx::query_as::<_, StageStatusRow>(
        r#"
        SELECT id, instance_id, stage_id, status, activated_at, resolved_at
        FROM signoff.stage_status
        WHERE instance_id = $1 AND stage_id = $2
        "#,
    )
    .bind(instance_id)
    .bind(stage_id)
    .fetch_optional(ex)
    .await?;

    Ok(status)
}

/// All stage statuses for an instance, in definition order.
pub async fn list_stage_statuses<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
) -> AppResult<Vec<StageStatusRow>> {
    let statuses = sqlx::query_as::<_, StageStatusRow>(
        r#"
        SELECT ss.id, ss.instance_id, ss.stage_id, ss.status, ss.activated_at, ss.resolved_at
        FROM signoff.stage_status ss
        JOIN signoff.approval_stage s ON s.id = ss.stage_id
        WHERE ss.instance_id = $1
        ORDER BY s.stage_order ASC
        "#,
    )
    .bind(instance_id)
    .fetch_all(ex)
    .await?;

    Ok(statuses)
}

pub async fn update_stage_status<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
    stage_id: Uuid,
    status: &str,
    resolved_at: Option<DateTime<Utc>>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE signoff.stage_status
        SET status = $3, resolved_at = $4
        WHERE instance_id = $1 AND stage_id = $2
        "#,
    )
    .bind(instance_id)
    .bind(stage_id)
    .bind(status)
    .bind(resolved_at)
    .execute(ex)
    .await?;

    Ok(())
}

/// Mark a not-yet-active stage as active.
pub async fn activate_stage<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
    stage_id: Uuid,
    activated_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE signoff.stage_status
        SET activated_at = $3
        WHERE instance_id = $1 AND stage_id = $2 AND activated_at IS NULL
        "#,
    )
    .bind(instance_id)
    .bind(stage_id)
    .bind(activated_at)
    .execute(ex)
    .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_decision<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    instance_id: Uuid,
    stage_id: Uuid,
    approver_id: Uuid,
    acted_by: Uuid,
    decision: &str,
    comment: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.stage_decision (
            id, instance_id, stage_id, approver_id, acted_by, decision, comment
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(instance_id)
    .bind(stage_id)
    .bind(approver_id)
    .bind(acted_by)
    .bind(decision)
    .bind(comment)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn list_stage_decisions<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
    stage_id: Uuid,
) -> AppResult<Vec<DecisionRow>> {
    let decisions = sqlx::query_as::<_, DecisionRow>(
        r#"
        SELECT id, instance_id, stage_id, approver_id, acted_by, decision, comment, created_at
        FROM signoff.stage_decision
        WHERE instance_id = $1 AND stage_id = $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(instance_id)
    .bind(stage_id)
    .fetch_all(ex)
    .await?;

    Ok(decisions)
}

pub async fn list_instance_decisions<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
) -> AppResult<Vec<DecisionRow>> {
    let decisions = sqlx::query_as::<_, DecisionRow>(
        r#"
        SELECT id, instance_id, stage_id, approver_id, acted_by, decision, comment, created_at
        FROM signoff.stage_decision
        WHERE instance_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(instance_id)
    .fetch_all(ex)
    .await?;

    Ok(decisions)
}
