use serde::{Deserialize, Serialize};

use crate::db::User;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorDto>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            code: None,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<FieldErrorDto>) -> Self {
        self.errors = errors;
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldErrorDto {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: message.into(),
        }
    }
}

/// Public subset of a user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
    /// Client name stored with the issued token, e.g. `ios`.
    pub source: Option<String>,
    pub source_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct AccessDto {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub user: UserDto,
    pub access: AccessDto,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct DataDownloadResponse {
    pub status: &'static str,
    pub data: serde_json::Map<String, serde_json::Value>,
}
