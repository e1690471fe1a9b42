//! Delegation rule queries.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::DelegationRule;
use crate::error::AppResult;

pub async fn insert_rule<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    company_id: Uuid,
    request_type: &str,
    from_employee_id: Uuid,
    to_employee_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.delegation_rule (
            id, company_id, request_type, from_employee_id, to_employee_id
        )
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(company_id)
    .bind(request_type)
    .bind(from_employee_id)
    .bind(to_employee_id)
    .execute(ex)
    .await?;

    Ok(())
}

/// All delegation rules covering any of the given employees, one round trip.
pub async fn delegates_for<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    request_type: &str,
    employee_ids: &[Uuid],
) -> AppResult<Vec<DelegationRule>> {
    let rules = sqlx::query_as::<_, DelegationRule>(
        r#"
        SELECT id, company_id, request_type, from_employee_id, to_employee_id, created_at
        FROM signoff.delegation_rule
        WHERE company_id = $1 AND request_type = $2 AND from_employee_id = ANY($3)
        "#,
    )
    .bind(company_id)
    .bind(request_type)
    .bind(employee_ids)
    .fetch_all(ex)
    .await?;

    Ok(rules)
}
