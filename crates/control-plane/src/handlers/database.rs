//! Database schema validation endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::db::schema;
use crate::error::AppResult;
use crate::state::AppState;

/// Schema validation response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub status: String,
    pub missing_tables: Vec<String>,
}

/// Check that every table the service needs exists.
///
/// `GET /api/db/validate`
pub async fn validate(State(state): State<AppState>) -> AppResult<(StatusCode, Json<ValidateResponse>)> {
    let missing = schema::missing_tables(&state.db).await?;
    let (code, status) = if missing.is_empty() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "incomplete")
    };

    Ok((
        code,
        Json(ValidateResponse {
            status: status.to_string(),
            missing_tables: missing,
        }),
    ))
}
