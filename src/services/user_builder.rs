use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

use crate::constants::SOURCE_WEB;
use crate::db::{NewUser, Store, User, UserWriteError};
use crate::domain::Role;
use crate::domain::events::UserEvent;
use crate::forms::is_valid_email;
use crate::services::password::Passwords;

#[derive(Debug, Error)]
pub enum UserBuilderError {
    #[error("{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for UserBuilderError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<sea_orm::DbErr> for UserBuilderError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Fluent constructor for new user rows.
///
/// ```rust,ignore
/// let user = UserBuilder::new(store, passwords, event_bus)
///     .email("jane@example.com")
///     .password("secret")
///     .source("backend")
///     .save()
///     .await?;
/// ```
pub struct UserBuilder {
    store: Store,
    passwords: Passwords,
    event_bus: broadcast::Sender<UserEvent>,
    email: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Role,
    active: bool,
    is_institution: bool,
    institution_name: Option<String>,
    ext_id: Option<i32>,
    source: String,
}

impl UserBuilder {
    #[must_use]
    pub fn new(
        store: Store,
        passwords: Passwords,
        event_bus: broadcast::Sender<UserEvent>,
    ) -> Self {
        Self {
            store,
            passwords,
            event_bus,
            email: None,
            password: None,
            first_name: None,
            last_name: None,
            role: Role::User,
            active: true,
            is_institution: false,
            institution_name: None,
            ext_id: None,
            source: SOURCE_WEB.to_string(),
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn first_name(mut self, first_name: Option<String>) -> Self {
        self.first_name = first_name;
        self
    }

    #[must_use]
    pub fn last_name(mut self, last_name: Option<String>) -> Self {
        self.last_name = last_name;
        self
    }

    #[must_use]
    pub const fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn institution(mut self, is_institution: bool, name: Option<String>) -> Self {
        self.is_institution = is_institution;
        self.institution_name = name;
        self
    }

    #[must_use]
    pub const fn ext_id(mut self, ext_id: Option<i32>) -> Self {
        self.ext_id = ext_id;
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    async fn validate(&self) -> Result<(String, String), UserBuilderError> {
        let mut errors = Vec::new();

        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        match email {
            None => errors.push("Email is required".to_string()),
            Some(email) if !is_valid_email(email) => {
                errors.push(format!("Email {email} is not valid"));
            }
            Some(email) => {
                if self.store.user_email_exists(email).await? {
                    errors.push(format!("Email {email} is already registered"));
                }
            }
        }

        let password = self.password.as_deref().filter(|p| !p.is_empty());
        if password.is_none() {
            errors.push("Password is required".to_string());
        }

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => {
                Ok((email.to_string(), password.to_string()))
            }
            _ => Err(UserBuilderError::Validation(errors)),
        }
    }

    /// Validate, hash the password and insert the row.
    ///
    /// # Errors
    ///
    /// [`UserBuilderError::Validation`] lists every problem found, including
    /// an e-mail taken by a concurrent insert.
    pub async fn save(self) -> Result<User, UserBuilderError> {
        let (email, password) = self.validate().await?;
        let password_hash = self.passwords.hash_blocking(&password).await?;

        let new_user = NewUser {
            email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            active: self.active,
            is_institution: self.is_institution,
            institution_name: self.institution_name,
            ext_id: self.ext_id,
            source: self.source.clone(),
        };

        let user = match self.store.insert_user(new_user).await {
            Ok(user) => user,
            Err(UserWriteError::DuplicateEmail(email)) => {
                return Err(UserBuilderError::Validation(vec![format!(
                    "Email {email} is already registered"
                )]));
            }
            Err(e) => return Err(UserBuilderError::Internal(e.to_string())),
        };

        info!(user_id = user.id, source = %self.source, "User created");
        let _ = self.event_bus.send(UserEvent::UserCreated {
            user_id: user.id,
            source: self.source,
        });

        Ok(user)
    }
}
