//! Username/password implementation of the [`Authenticator`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::db::{NewLoginAttempt, Store, User};
use crate::domain::LoginStatus;
use crate::domain::events::UserEvent;
use crate::i18n::Translator;
use crate::services::authenticator::{AuthContext, AuthError, Authenticator, Credentials};
use crate::services::password::Passwords;
use crate::services::user_manager::UserManager;

pub struct UsernameAuthenticator {
    store: Store,
    passwords: Passwords,
    user_manager: UserManager,
    translator: Arc<dyn Translator>,
    event_bus: broadcast::Sender<UserEvent>,
    auto_rehash: bool,
}

impl UsernameAuthenticator {
    #[must_use]
    pub fn new(
        store: Store,
        passwords: Passwords,
        user_manager: UserManager,
        translator: Arc<dyn Translator>,
        event_bus: broadcast::Sender<UserEvent>,
    ) -> Self {
        Self {
            store,
            passwords,
            user_manager,
            translator,
            event_bus,
            auto_rehash: true,
        }
    }

    /// Toggle re-hashing of stored passwords produced with outdated parameters.
    #[must_use]
    pub const fn with_auto_rehash(mut self, enabled: bool) -> Self {
        self.auto_rehash = enabled;
        self
    }

    async fn record_attempt(
        &self,
        email: &str,
        user: Option<&User>,
        status: LoginStatus,
        message: Option<&str>,
        context: &AuthContext,
    ) -> anyhow::Result<()> {
        metrics::counter!("auth_login_attempts_total", "status" => status.as_str()).increment(1);

        self.store
            .add_login_attempt(NewLoginAttempt {
                email: email.to_string(),
                user_id: user.map(|u| u.id),
                source: context.source.clone(),
                status,
                message: message.map(str::to_string),
                ip: context.ip.clone(),
                user_agent: context.user_agent.clone(),
            })
            .await
    }

    /// Record a failed attempt and hand back `err`. A broken audit write is
    /// logged; the caller still sees the authentication error.
    async fn reject(
        &self,
        email: &str,
        user: Option<&User>,
        status: LoginStatus,
        message: &str,
        context: &AuthContext,
        err: AuthError,
    ) -> AuthError {
        if let Err(e) = self
            .record_attempt(email, user, status, Some(message), context)
            .await
        {
            error!(error = %e, email, status = %status, "Failed to record login attempt");
        }

        let _ = self.event_bus.send(UserEvent::LoginFailed {
            email: email.to_string(),
            source: context.source.clone(),
            status,
        });

        err
    }

    fn identity_not_found(&self, key: &str) -> AuthError {
        AuthError::IdentityNotFound(self.translator.translate(key))
    }

    async fn process_always_login(
        &self,
        username: &str,
        context: &AuthContext,
    ) -> Result<User, AuthError> {
        let user = self.store.get_user_by_email(username).await?;

        let Some(user) = user else {
            let err = self.identity_not_found("users.authenticator.identity_not_found");
            return Err(self
                .reject(
                    username,
                    None,
                    LoginStatus::LoginAfterSignUp,
                    "Wrong e-mail.",
                    context,
                    err,
                )
                .await);
        };

        self.record_attempt(username, Some(&user), LoginStatus::LoginAfterSignUp, None, context)
            .await?;

        info!(user_id = user.id, source = %context.source, "User signed in after sign-up");
        let _ = self.event_bus.send(UserEvent::SignedIn {
            user_id: user.id,
            source: context.source.clone(),
            status: LoginStatus::LoginAfterSignUp,
        });

        Ok(user)
    }

    async fn process(
        &self,
        username: &str,
        password: &str,
        context: &AuthContext,
    ) -> Result<User, AuthError> {
        let Some((user, password_hash)) =
            self.store.get_user_by_email_with_password(username).await?
        else {
            let err = self.identity_not_found("users.authenticator.identity_not_found");
            return Err(self
                .reject(
                    username,
                    None,
                    LoginStatus::NotFoundEmail,
                    "Wrong e-mail.",
                    context,
                    err,
                )
                .await);
        };

        if !Passwords::verify_blocking(password, &password_hash).await? {
            let err = AuthError::InvalidCredential(
                self.translator
                    .translate("users.authenticator.invalid_credentials"),
            );
            return Err(self
                .reject(
                    username,
                    Some(&user),
                    LoginStatus::WrongPass,
                    "Wrong password.",
                    context,
                    err,
                )
                .await);
        }

        // Inactive accounts report IdentityNotFound, not InvalidCredential.
        if !user.active {
            let err = self.identity_not_found("users.authenticator.inactive_account");
            return Err(self
                .reject(
                    username,
                    Some(&user),
                    LoginStatus::InactiveUser,
                    "Account is not active.",
                    context,
                    err,
                )
                .await);
        }

        if self.auto_rehash && self.passwords.needs_rehash(&password_hash) {
            let new_hash = self.passwords.hash_blocking(password).await?;
            self.store
                .update_user_password_hash(user.id, new_hash)
                .await?;
            info!(user_id = user.id, "Password hash upgraded to current parameters");
            let _ = self
                .event_bus
                .send(UserEvent::PasswordRehashed { user_id: user.id });
        }

        let status = if context.api {
            LoginStatus::ApiOk
        } else {
            LoginStatus::Ok
        };
        self.record_attempt(username, Some(&user), status, None, context)
            .await?;

        self.store.add_user_sign_in(user.id).await?;

        if user.confirmed_at.is_none() {
            self.user_manager.confirm_user(&user).await?;
        }

        info!(user_id = user.id, source = %context.source, status = %status, "User signed in");
        let _ = self.event_bus.send(UserEvent::SignedIn {
            user_id: user.id,
            source: context.source.clone(),
            status,
        });

        // Hand back the row as it is after the sign-in bookkeeping.
        match self.store.get_user(user.id).await? {
            Some(fresh) => Ok(fresh),
            None => {
                warn!(user_id = user.id, "User vanished during sign-in");
                Ok(user)
            }
        }
    }
}

#[async_trait]
impl Authenticator for UsernameAuthenticator {
    async fn authenticate(
        &self,
        credentials: Credentials,
        context: &AuthContext,
    ) -> Result<User, AuthError> {
        match credentials {
            Credentials::AlwaysLogin { username } => {
                self.process_always_login(&username, context).await
            }
            Credentials::Password { username, password } => {
                self.process(&username, &password, context).await
            }
        }
    }
}
