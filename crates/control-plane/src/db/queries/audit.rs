//! Audit trail queries. The log is append-only; there are no UPDATE or
//! DELETE statements against it anywhere in the crate.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::AuditEntry;
use crate::error::AppResult;

pub async fn insert_entry<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    instance_id: Uuid,
    actor_id: Option<Uuid>,
    kind: &str,
    details: &serde_json::Value,
) -> AppResult<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO signoff.approval_audit_log (instance_id, company_id, kind, actor_id, details)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(instance_id)
    .bind(company_id)
    .bind(kind)
    .bind(actor_id)
    .bind(details)
    .fetch_one(ex)
    .await?;

    Ok(id)
}

/// Audit entries for an instance in insertion order. The bigserial id gives
/// a total order even when entries share a timestamp.
pub async fn list_for_instance<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    instance_id: Uuid,
) -> AppResult<Vec<AuditEntry>> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT id, instance_id, company_id, kind, actor_id, details, created_at
        FROM signoff.approval_audit_log
        WHERE company_id = $1 AND instance_id = $2
        ORDER BY id ASC
        "#,
    )
    .bind(company_id)
    .bind(instance_id)
    .fetch_all(ex)
    .await?;

    Ok(entries)
}
