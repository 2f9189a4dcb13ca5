use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::forms::Form;
use crate::i18n::Translator;
use crate::services::UserManager;

type SuccessCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Builds and processes the "forgot password" form.
pub struct RequestPasswordFormFactory {
    user_manager: UserManager,
    translator: Arc<dyn Translator>,
    on_success: Option<SuccessCallback>,
}

impl RequestPasswordFormFactory {
    #[must_use]
    pub fn new(user_manager: UserManager, translator: Arc<dyn Translator>) -> Self {
        Self {
            user_manager,
            translator,
            on_success: None,
        }
    }

    /// Called with the submitted e-mail once a reset token was issued.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn create(&self) -> Form {
        let t = |key: &str| self.translator.translate(key);

        let mut form = Form::new("request_password");
        form.add_email("email", t("users.frontend.request_password.email.label"))
            .required(t("users.frontend.request_password.email.required"))
            .email(t("users.frontend.request_password.email.invalid_format"))
            .placeholder(t("users.frontend.request_password.email.placeholder"));
        form.set_submit_label(t("users.frontend.request_password.submit"));
        form
    }

    /// Validate and process a filled form. Returns `true` on success; on
    /// failure the reasons are attached to the form.
    pub async fn submit(&self, form: &mut Form) -> Result<bool> {
        if !form.validate() {
            return Ok(false);
        }

        let Some(email) = form.value("email").map(str::to_string) else {
            return Ok(false);
        };

        // Unknown addresses pass this rule; only an existing inactive account fails it.
        let existing = self.user_manager.load_user_by_email(&email).await?;
        if let Some(user) = existing.filter(|u| !u.active) {
            debug!(user_id = user.id, "Password reset refused for inactive account");
            form.add_error(
                "email",
                self.translator
                    .translate("users.frontend.request_password.inactive_user"),
            );
            return Ok(false);
        }

        if !self.user_manager.request_reset_password(&email).await? {
            form.add_error(
                "email",
                self.translator
                    .translate("users.frontend.request_password.invalid_email"),
            );
            return Ok(false);
        }

        if let Some(callback) = &self.on_success {
            callback(&email);
        }
        Ok(true)
    }
}
