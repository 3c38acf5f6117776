use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::forms::FieldError;
use crate::passwords::PasswordError;
use crate::store::DbError;
use crate::validation::ValidationReport;

/// Everything a handler can fail with. Rendered as a JSON `{message}` body,
/// plus `errors` for validation failures and `error` for malformed field
/// batches (and, in debug builds, for internal failures).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid field data")]
    InvalidField(#[from] FieldError),

    #[error("Validation failed")]
    Validation(ValidationReport),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unauthorized access")]
    Forbidden,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        source: DbError,
    },

    #[error("{message}")]
    Internal {
        message: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::InvalidField(_)
            | ApiError::Validation(_)
            | ApiError::EmailTaken => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Auth(err) => err.status_code(),
            ApiError::Storage { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let body = match self {
            ApiError::Auth(err) => return err.into_response(),
            ApiError::Validation(report) => json!({
                "message": message,
                "errors": report,
            }),
            ApiError::InvalidField(err) => json!({
                "message": message,
                "error": err.to_string(),
            }),
            ApiError::Storage { source, .. } => {
                tracing::error!(code = source.code(), error = %source, "{message}");
                internal_body(&message, &source.to_string())
            }
            ApiError::Internal { detail, .. } => {
                tracing::error!(error = %detail, "{message}");
                internal_body(&message, &detail)
            }
            _ => json!({ "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

fn internal_body(message: &str, detail: &str) -> serde_json::Value {
    if cfg!(debug_assertions) {
        json!({ "message": message, "error": detail })
    } else {
        json!({ "message": message })
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal {
            message: "Password hashing failed",
            detail: err.to_string(),
        }
    }
}

/// Attaches the user-facing message to a storage failure.
pub trait StorageContext<T> {
    fn or_fail(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StorageContext<T> for Result<T, DbError> {
    fn or_fail(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Storage { message, source })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
