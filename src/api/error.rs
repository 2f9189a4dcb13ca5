use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::{ErrorResponse, FieldErrorDto};
use crate::services::AuthError;

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(String),

    /// Form submitted with invalid fields.
    FormErrors(Vec<FieldErrorDto>),

    Forbidden(String),

    Unauthorized { message: String, code: String },

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::FormErrors(errors) => write!(f, "Form has {} error(s)", errors.len()),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Unauthorized { message, code } => write!(f, "Unauthorized ({code}): {message}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("A database error occurred"),
                )
            }
            Self::FormErrors(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Form contains errors").with_errors(errors),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::new(msg)),
            Self::Unauthorized { message, code } => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new(message).with_code(code),
            ),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("An internal error occurred"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = err.code().to_string();
        match err {
            AuthError::IdentityNotFound(message) | AuthError::InvalidCredential(message) => {
                Self::Unauthorized { message, code }
            }
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl ApiError {
    /// The response every endpoint gives when no user could be resolved.
    #[must_use]
    pub fn cannot_authorize() -> Self {
        Self::Forbidden("Cannot authorize user".to_string())
    }
}
