//! HTTP handlers for the Signoff Control Plane API.

pub mod approval;
pub mod audit;
pub mod database;
pub mod delegation;
pub mod health;
pub mod workflow;

pub use health::{api_health, health_check};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Tenant header consumed by every `/api` route.
pub const COMPANY_ID_HEADER: &str = "x-company-id";

/// Tenant identity extracted from the `X-Company-Id` header.
///
/// The upstream gateway authenticates the caller and stamps this header;
/// this service treats it as the sole tenant boundary and scopes every
/// query by it.
#[derive(Debug, Clone, Copy)]
pub struct CompanyId(pub Uuid);

impl<S> FromRequestParts<S> for CompanyId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(COMPANY_ID_HEADER)
            .ok_or_else(|| AppError::Validation("Missing X-Company-Id header".to_string()))?;
        let value = header
            .to_str()
            .map_err(|_| AppError::Validation("Invalid X-Company-Id header".to_string()))?;
        let company_id = Uuid::parse_str(value).map_err(|_| {
            AppError::Validation(format!("X-Company-Id is not a UUID: {}", value))
        })?;
        Ok(CompanyId(company_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<CompanyId, AppError> {
        let mut builder = Request::builder().uri("/api/workflows");
        if let Some(value) = header {
            builder = builder.header(COMPANY_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CompanyId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_company_id_extraction() {
        let id = Uuid::new_v4();
        let extracted = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(extracted.0, id);
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        assert!(extract(None).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_header_rejected() {
        assert!(extract(Some("not-a-uuid")).await.is_err());
    }
}
