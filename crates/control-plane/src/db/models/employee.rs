//! Employee roster reference.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Minimal view of a roster entry, as resolved by the HR collaborator's
/// employee table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRef {
    pub id: Uuid,
    pub display_name: String,
}
