//! Embedded schema DDL and validation.
//!
//! The DDL is idempotent (`IF NOT EXISTS` throughout) so it can be applied
//! on every startup.

use crate::db::DbPool;
use crate::error::AppResult;

/// Embedded schema DDL.
pub const SCHEMA_DDL: &str = include_str!("schema.sql");

/// Tables the control plane requires.
pub const REQUIRED_TABLES: &[&str] = &[
    "employee",
    "approval_workflow",
    "approval_stage",
    "stage_approver",
    "request",
    "approval_instance",
    "stage_status",
    "stage_decision",
    "approval_audit_log",
    "approval_notification",
    "delegation_rule",
];

/// Apply the embedded schema DDL.
pub async fn init_schema(pool: &DbPool) -> AppResult<()> {
    sqlx::raw_sql(SCHEMA_DDL).execute(pool).await?;
    tracing::info!("Schema DDL applied");
    Ok(())
}

/// Check for required tables; returns the missing ones.
pub async fn missing_tables(pool: &DbPool) -> AppResult<Vec<String>> {
    let existing: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = 'signoff'",
    )
    .fetch_all(pool)
    .await?;

    Ok(REQUIRED_TABLES
        .iter()
        .filter(|t| !existing.contains(&t.to_string()))
        .map(|s| s.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_covers_required_tables() {
        for table in REQUIRED_TABLES {
            assert!(
                SCHEMA_DDL.contains(&format!("signoff.{}", table)),
                "DDL missing table {}",
                table
            );
        }
    }

    #[test]
    fn test_ddl_has_race_closing_constraints() {
        assert!(SCHEMA_DDL.contains("UNIQUE (instance_id, stage_id, approver_id)"));
        assert!(SCHEMA_DDL.contains("UNIQUE (parent_instance_id)"));
        assert!(SCHEMA_DDL.contains("WHERE status = 'PENDING'"));
        assert!(SCHEMA_DDL.contains("UNIQUE (workflow_id, stage_order)"));
    }
}
