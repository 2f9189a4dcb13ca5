//! Translation of user-facing message keys.
//!
//! Services and forms only ever pass keys such as
//! `users.authenticator.invalid_credentials`; the text comes from a
//! [`Translator`]. [`MessageCatalog`] ships English defaults and can be
//! overlaid from a TOML file.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

pub trait Translator: Send + Sync {
    /// Returns the message for `key`, or the key itself when unknown.
    fn translate(&self, key: &str) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("users.authenticator.identity_not_found", "Wrong e-mail or password."),
    ("users.authenticator.invalid_credentials", "Wrong e-mail or password."),
    ("users.authenticator.inactive_account", "This account is not active."),
    ("users.frontend.request_password.email.label", "E-mail"),
    ("users.frontend.request_password.email.required", "Please enter your e-mail."),
    ("users.frontend.request_password.email.placeholder", "e.g. name@example.com"),
    ("users.frontend.request_password.email.invalid_format", "Please enter a valid e-mail."),
    ("users.frontend.request_password.inactive_user", "This account is not active."),
    ("users.frontend.request_password.invalid_email", "No account exists for this e-mail."),
    ("users.frontend.request_password.submit", "Send"),
    ("users.admin.user_form.credentials", "Credentials"),
    ("users.admin.user_form.email.label", "E-mail"),
    ("users.admin.user_form.email.required", "E-mail is required."),
    ("users.admin.user_form.email.invalid_format", "E-mail has an invalid format."),
    ("users.admin.user_form.email.placeholder", "e.g. name@example.com"),
    ("users.admin.user_form.email.duplicate", "A user with this e-mail already exists."),
    ("users.admin.user_form.password.label", "Password"),
    ("users.admin.user_form.password.placeholder", "Password"),
    ("users.admin.user_form.password.required", "Password is required."),
    ("users.admin.user_form.password.description", "Leave empty to keep the current password."),
    ("users.admin.user_form.personal_information", "Personal information"),
    ("users.admin.user_form.first_name.label", "First name"),
    ("users.admin.user_form.first_name.placeholder", "e.g. Jane"),
    ("users.admin.user_form.last_name.label", "Last name"),
    ("users.admin.user_form.last_name.placeholder", "e.g. Doe"),
    ("users.admin.user_form.institution", "Institution"),
    ("users.admin.user_form.is_institution", "Institution account"),
    ("users.admin.user_form.institution_name.label", "Institution name"),
    ("users.admin.user_form.institution_name.placeholder", "e.g. City Library"),
    ("users.admin.user_form.institution_name.required", "Institution name is required."),
    ("users.admin.user_form.other", "Other"),
    ("users.admin.user_form.external_id.label", "External ID"),
    ("users.admin.user_form.external_id.placeholder", "e.g. 1234"),
    ("users.admin.user_form.external_id.integer", "External ID must be a whole number."),
    ("users.admin.user_form.role.label", "Role"),
    ("users.admin.user_form.role.user", "User"),
    ("users.admin.user_form.role.admin", "Administrator"),
    ("users.admin.user_form.role.invalid", "Unknown role."),
    ("users.admin.user_form.active", "Active"),
    ("users.admin.user_form.submit", "Save"),
];

impl MessageCatalog {
    /// Catalog with the built-in English messages.
    #[must_use]
    pub fn with_defaults() -> Self {
        let messages = DEFAULT_MESSAGES
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { messages }
    }

    /// Built-in messages overlaid with a flat `key = "text"` TOML file.
    pub fn load_with_overrides(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message catalog: {}", path.display()))?;
        let overrides: HashMap<String, String> = toml::from_str(&content)
            .with_context(|| format!("Failed to parse message catalog: {}", path.display()))?;

        let mut catalog = Self::with_defaults();
        catalog.messages.extend(overrides);
        Ok(catalog)
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(key.into(), message.into());
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
