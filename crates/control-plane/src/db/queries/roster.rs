//! Employee roster lookups.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::EmployeeRef;
use crate::error::AppResult;

/// Resolve a batch of employee ids within a tenant. Callers compare the
/// result length against the input to detect unknown ids.
pub async fn resolve_employees<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    employee_ids: &[Uuid],
) -> AppResult<Vec<EmployeeRef>> {
    let employees = sqlx::query_as::<_, EmployeeRef>(
        r#"
        SELECT id, display_name
        FROM signoff.employee
        WHERE company_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(company_id)
    .bind(employee_ids)
    .fetch_all(ex)
    .await?;

    Ok(employees)
}

/// Whether one employee exists in the tenant roster.
pub async fn employee_exists<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    employee_id: Uuid,
) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM signoff.employee WHERE company_id = $1 AND id = $2
        )
        "#,
    )
    .bind(company_id)
    .bind(employee_id)
    .fetch_one(ex)
    .await?;

    Ok(exists)
}
