use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;
use validator::ValidationErrors;

#[derive(Debug, ThisError)]
pub enum HubError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid worker key")]
    InvalidWorkerKey,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("too many login attempts")]
    RateLimited,

    #[error("alert ingestion is not configured")]
    IngestDisabled,

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Token encoding error: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl HubError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        HubError::Validation(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }
}

impl From<ValidationErrors> for HubError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value ({})", e.code)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        HubError::Validation(details)
    }
}

impl From<JsonRejection> for HubError {
    fn from(rejection: JsonRejection) -> Self {
        HubError::field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for HubError {
    fn from(rejection: QueryRejection) -> Self {
        HubError::field("query", rejection.body_text())
    }
}

impl From<argon2::password_hash::Error> for HubError {
    fn from(e: argon2::password_hash::Error) -> Self {
        HubError::PasswordHash(e.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            HubError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("VALIDATION_ERROR", "Validation failed").with_details(details),
            ),
            HubError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiErrorResponse::new("UNAUTHORIZED", "Invalid username or password"),
            ),
            HubError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                ApiErrorResponse::new("UNAUTHORIZED", "No token provided"),
            ),
            HubError::InvalidToken | HubError::InvalidWorkerKey => (
                StatusCode::UNAUTHORIZED,
                ApiErrorResponse::new("UNAUTHORIZED", "Invalid token"),
            ),
            HubError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiErrorResponse::new("NOT_FOUND", format!("{what} not found")),
            ),
            HubError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorResponse::new("RATE_LIMIT", "Too many login attempts, try again later"),
            ),
            HubError::IngestDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorResponse::new("INGEST_DISABLED", "Alert ingestion is not configured"),
            ),
            err @ (HubError::DatabaseError(_)
            | HubError::PasswordHash(_)
            | HubError::TokenEncoding(_)
            | HubError::JsonError(_)
            | HubError::RactorError(_)
            | HubError::JoinError(_)) => {
                error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("INTERNAL_ERROR", "Internal server error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// One failing field of a request body or query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Standardized API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn validation_errors_become_sorted_details() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "rtspUrl",
            ValidationError::new("url").with_message("bad url".into()),
        );
        errors.add("name", ValidationError::new("length"));

        let HubError::Validation(details) = HubError::from(errors) else {
            panic!("expected validation error");
        };
        assert_eq!(
            details,
            vec![
                FieldError {
                    field: "name".to_string(),
                    message: "invalid value (length)".to_string(),
                },
                FieldError {
                    field: "rtspUrl".to_string(),
                    message: "bad url".to_string(),
                },
            ]
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let resp = HubError::RactorError("mailbox closed".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
