//! Delegation rule service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::RequestType;
use crate::db::queries::{delegation as queries, roster};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Request to create a delegation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDelegationRequest {
    pub request_type: RequestType,
    pub from_employee_id: Uuid,
    pub to_employee_id: Uuid,
}

/// Response after creating a delegation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDelegationResponse {
    pub id: Uuid,
    pub request_type: String,
    pub from_employee_id: Uuid,
    pub to_employee_id: Uuid,
}

/// Service for delegation rules.
#[derive(Clone)]
pub struct DelegationService {
    pool: DbPool,
}

impl DelegationService {
    /// Create a new delegation service.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a delegation rule. One rule per (tenant, type, delegator);
    /// a second registration conflicts instead of silently replacing.
    pub async fn create_rule(
        &self,
        company_id: Uuid,
        request: CreateDelegationRequest,
    ) -> AppResult<CreateDelegationResponse> {
        if request.from_employee_id == request.to_employee_id {
            return Err(AppError::Validation(
                "Cannot delegate approvals to oneself".to_string(),
            ));
        }
        for employee_id in [request.from_employee_id, request.to_employee_id] {
            if !roster::employee_exists(&self.pool, company_id, employee_id).await? {
                return Err(AppError::Validation(format!(
                    "Unknown employee: {}",
                    employee_id
                )));
            }
        }

        let id = Uuid::new_v4();
        let request_type = request.request_type.as_str();
        queries::insert_rule(
            &self.pool,
            id,
            company_id,
            request_type,
            request.from_employee_id,
            request.to_employee_id,
        )
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(
                e,
                "A delegation rule already exists for this employee and request type",
            )
        })?;

        tracing::info!(
            company_id = %company_id,
            request_type,
            from = %request.from_employee_id,
            to = %request.to_employee_id,
            "Created delegation rule"
        );

        Ok(CreateDelegationResponse {
            id,
            request_type: request_type.to_string(),
            from_employee_id: request.from_employee_id,
            to_employee_id: request.to_employee_id,
        })
    }
}
