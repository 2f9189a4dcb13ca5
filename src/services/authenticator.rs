//! Username/password authentication.
//!
//! An [`Authenticator`] turns [`Credentials`] into a resolved [`User`] or an
//! [`AuthError`]. Every attempt, successful or not, ends up in the
//! `login_attempts` audit log.

use thiserror::Error;

use crate::constants::SOURCE_WEB;
use crate::db::User;

/// Credential shapes accepted by the username authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Regular login: the password is checked against the stored hash.
    Password { username: String, password: String },

    /// Login right after self-service sign-up. The password is not checked,
    /// so only the sign-up flow may build this.
    AlwaysLogin { username: String },
}

impl Credentials {
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn always_login(username: impl Into<String>) -> Self {
        Self::AlwaysLogin {
            username: username.into(),
        }
    }

    /// Build credentials from loosely collected request parts.
    ///
    /// Returns `None` when the parts do not form either shape, meaning these
    /// are not credentials this authenticator handles. `always_login` wins
    /// over a password when both are present.
    #[must_use]
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        always_login: bool,
    ) -> Option<Self> {
        match (username, password) {
            (Some(username), _) if always_login => Some(Self::AlwaysLogin { username }),
            (Some(username), Some(password)) => Some(Self::Password { username, password }),
            _ => None,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::Password { username, .. } | Self::AlwaysLogin { username } => username,
        }
    }
}

/// Request context of an authentication attempt.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub source: String,
    pub api: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self {
            source: SOURCE_WEB.to_string(),
            api: false,
            ip: None,
            user_agent: None,
        }
    }
}

impl AuthContext {
    #[must_use]
    pub fn api(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            api: true,
            ..Self::default()
        }
    }
}

/// Errors specific to authentication.
///
/// The two credential variants carry a message already translated for the
/// end user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    IdentityNotFound(String),

    #[error("{0}")]
    InvalidCredential(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine code for API clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IdentityNotFound(_) => "identity_not_found",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::Database(_) | Self::Internal(_) => "internal_error",
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve credentials to an active user.
    ///
    /// # Errors
    ///
    /// [`AuthError::IdentityNotFound`] for unknown or inactive accounts,
    /// [`AuthError::InvalidCredential`] for a wrong password.
    async fn authenticate(
        &self,
        credentials: Credentials,
        context: &AuthContext,
    ) -> Result<User, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_requires_username() {
        assert_eq!(Credentials::from_parts(None, Some("x".into()), false), None);
        assert_eq!(Credentials::from_parts(None, None, true), None);
    }

    #[test]
    fn from_parts_requires_password_without_always_login() {
        assert_eq!(
            Credentials::from_parts(Some("a@b.sk".into()), None, false),
            None
        );
        assert_eq!(
            Credentials::from_parts(Some("a@b.sk".into()), Some("pw".into()), false),
            Some(Credentials::password("a@b.sk", "pw"))
        );
    }

    #[test]
    fn always_login_takes_precedence() {
        assert_eq!(
            Credentials::from_parts(Some("a@b.sk".into()), Some("pw".into()), true),
            Some(Credentials::always_login("a@b.sk"))
        );
    }

    #[test]
    fn error_displays_translated_message() {
        let err = AuthError::InvalidCredential("Wrong e-mail or password.".into());
        assert_eq!(err.to_string(), "Wrong e-mail or password.");
        assert_eq!(err.code(), "invalid_credential");
    }
}
