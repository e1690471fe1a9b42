//! Notification queries. Tenant scoping happens through the owning
//! instance, which callers resolve first.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::Notification;
use crate::error::AppResult;

pub async fn insert_notification<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
    stage_id: Uuid,
    recipient_id: Uuid,
    message: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO signoff.approval_notification (instance_id, stage_id, recipient_id, message)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(instance_id)
    .bind(stage_id)
    .bind(recipient_id)
    .bind(message)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn list_for_instance<'e>(
    ex: impl PgExecutor<'e>,
    instance_id: Uuid,
) -> AppResult<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, instance_id, stage_id, recipient_id, message, created_at
        FROM signoff.approval_notification
        WHERE instance_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(instance_id)
    .fetch_all(ex)
    .await?;

    Ok(notifications)
}
