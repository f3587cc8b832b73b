use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::jira::JiraError;
use crate::rollup::RollupError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Rollup(#[from] RollupError),

    #[error("Jira error: {0}")]
    Jira(#[from] JiraError),

    #[error("Jira is not configured")]
    JiraNotConfigured,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::Jira(JiraError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Rollup(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Jira(_) => StatusCode::BAD_GATEWAY,
            AppError::JiraNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Rollup(e) => ("MALFORMED_HIERARCHY", e.to_string()),
            AppError::Jira(JiraError::NotFound(what)) => {
                ("NOT_FOUND", format!("Jira resource not found: {what}"))
            }
            AppError::Jira(e) => {
                tracing::error!("Jira error: {e}");
                (
                    "JIRA_ERROR",
                    "The Jira request failed; see server logs".to_string(),
                )
            }
            AppError::JiraNotConfigured => (
                "JIRA_NOT_CONFIGURED",
                "Set JIRA_BASE_URL, JIRA_EMAIL and JIRA_API_TOKEN to enable Jira reports"
                    .to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
