use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::db::{Store, User};
use crate::domain::events::UserEvent;

/// Account-level operations shared by the authenticator and the forms.
#[derive(Clone)]
pub struct UserManager {
    store: Store,
    event_bus: broadcast::Sender<UserEvent>,
    reset_token_ttl_minutes: i64,
}

impl UserManager {
    #[must_use]
    pub const fn new(
        store: Store,
        event_bus: broadcast::Sender<UserEvent>,
        reset_token_ttl_minutes: i64,
    ) -> Self {
        Self {
            store,
            event_bus,
            reset_token_ttl_minutes,
        }
    }

    pub async fn load_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.get_user_by_email(email).await
    }

    /// Stamp `confirmed_at`. Already confirmed users are left alone.
    pub async fn confirm_user(&self, user: &User) -> Result<()> {
        if user.confirmed_at.is_some() {
            return Ok(());
        }

        self.store.confirm_user(user.id).await?;
        info!(user_id = user.id, "User confirmed");
        let _ = self
            .event_bus
            .send(UserEvent::UserConfirmed { user_id: user.id });
        Ok(())
    }

    /// Issue a password reset token for `email`.
    ///
    /// Returns `false` when no account exists for the address. Delivery of the
    /// token is left to whoever listens for `PasswordResetRequested`.
    pub async fn request_reset_password(&self, email: &str) -> Result<bool> {
        let Some(user) = self.store.get_user_by_email(email).await? else {
            debug!(email, "Password reset requested for unknown e-mail");
            return Ok(false);
        };

        self.store
            .create_password_reset_token(user.id, self.reset_token_ttl_minutes)
            .await?;

        info!(user_id = user.id, "Password reset requested");
        let _ = self
            .event_bus
            .send(UserEvent::PasswordResetRequested { user_id: user.id });
        Ok(true)
    }
}
