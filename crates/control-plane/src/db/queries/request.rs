//! Domain request queries.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::RequestRow;
use crate::error::AppResult;

pub async fn insert_request<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
    company_id: Uuid,
    request_type: &str,
    module_id: Uuid,
    requested_by: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.request (id, company_id, request_type, module_id, requested_by)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(company_id)
    .bind(request_type)
    .bind(module_id)
    .bind(requested_by)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn get_request<'e>(
    ex: impl PgExecutor<'e>,
    company_id: Uuid,
    request_id: Uuid,
) -> AppResult<Option<RequestRow>> {
    let request = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT id, company_id, request_type, module_id, requested_by, created_at
        FROM signoff.request
        WHERE company_id = $1 AND id = $2
        "#,
    )
    .bind(company_id)
    .bind(request_id)
    .fetch_optional(ex)
    .await?;

    Ok(request)
}
