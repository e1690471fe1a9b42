//! Domain request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A submitted request awaiting approval. `module_id` references the domain
/// object under approval (an expense report, an attendance correction, ...),
/// owned by the excluded CRUD layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequestRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub request_type: String,
    pub module_id: Uuid,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
}
