//! Audit and notification read service.
//!
//! Writes happen inside the approval and resubmission transactions; this
//! service only exposes tenant-scoped reads.

use uuid::Uuid;

use crate::db::models::{AuditEntry, Notification};
use crate::db::queries::{audit as queries, instance, notification};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Service for audit trail reads.
#[derive(Clone)]
pub struct AuditService {
    pool: DbPool,
}

impl AuditService {
    /// Create a new audit service.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Audit entries for an instance in insertion order.
    pub async fn list_for_instance(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
    ) -> AppResult<Vec<AuditEntry>> {
        self.ensure_instance(company_id, instance_id).await?;
        queries::list_for_instance(&self.pool, company_id, instance_id).await
    }

    /// Notifications queued for an instance.
    pub async fn list_notifications(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
    ) -> AppResult<Vec<Notification>> {
        self.ensure_instance(company_id, instance_id).await?;
        notification::list_for_instance(&self.pool, instance_id).await
    }

    async fn ensure_instance(&self, company_id: Uuid, instance_id: Uuid) -> AppResult<()> {
        instance::get_instance(&self.pool, company_id, instance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instance not found: {}", instance_id)))?;
        Ok(())
    }
}
