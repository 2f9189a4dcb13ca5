//! Backend user profile form (create and edit).

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::constants::SOURCE_BACKEND;
use crate::db::{Store, User, UserChanges, UserWriteError};
use crate::domain::Role;
use crate::domain::events::UserEvent;
use crate::forms::{Form, SelectOption};
use crate::i18n::Translator;
use crate::services::{Passwords, UserBuilder, UserBuilderError};

/// Contributes extra fields to the user form.
///
/// Providers run in registration order between the institution group and
/// the "other" group. They own persistence of whatever they add.
pub trait UserFormDataProvider: Send + Sync {
    fn provide(&self, form: Form, user: Option<&User>) -> Form;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFormOutcome {
    Created(User),
    Updated(User),
}

type UserCallback = Arc<dyn Fn(&Form, &User) + Send + Sync>;

pub struct UserFormFactory {
    store: Store,
    passwords: Passwords,
    translator: Arc<dyn Translator>,
    event_bus: broadcast::Sender<UserEvent>,
    providers: Vec<Arc<dyn UserFormDataProvider>>,
    on_save: Option<UserCallback>,
    on_update: Option<UserCallback>,
}

impl UserFormFactory {
    #[must_use]
    pub fn new(
        store: Store,
        passwords: Passwords,
        translator: Arc<dyn Translator>,
        event_bus: broadcast::Sender<UserEvent>,
    ) -> Self {
        Self {
            store,
            passwords,
            translator,
            event_bus,
            providers: Vec::new(),
            on_save: None,
            on_update: None,
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn UserFormDataProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn on_save(mut self, callback: impl Fn(&Form, &User) + Send + Sync + 'static) -> Self {
        self.on_save = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_update(mut self, callback: impl Fn(&Form, &User) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(callback));
        self
    }

    /// Build the form, prefilled from the user when `user_id` is given.
    pub async fn create(&self, user_id: Option<i32>) -> Result<Form> {
        let user = match user_id {
            Some(id) => Some(
                self.store
                    .get_user(id)
                    .await?
                    .with_context(|| format!("User not found: {id}"))?,
            ),
            None => None,
        };

        let t = |key: &str| self.translator.translate(key);
        let mut form = Form::new("user");

        form.add_group(t("users.admin.user_form.credentials"));
        form.add_email("email", t("users.admin.user_form.email.label"))
            .required(t("users.admin.user_form.email.required"))
            .email(t("users.admin.user_form.email.invalid_format"))
            .placeholder(t("users.admin.user_form.email.placeholder"));
        let password = form
            .add_password("password", t("users.admin.user_form.password.label"))
            .placeholder(t("users.admin.user_form.password.placeholder"));
        if user.is_some() {
            password.description(t("users.admin.user_form.password.description"));
        } else {
            password.required(t("users.admin.user_form.password.required"));
        }

        form.add_group(t("users.admin.user_form.personal_information"));
        form.add_text("first_name", t("users.admin.user_form.first_name.label"))
            .placeholder(t("users.admin.user_form.first_name.placeholder"));
        form.add_text("last_name", t("users.admin.user_form.last_name.label"))
            .placeholder(t("users.admin.user_form.last_name.placeholder"));

        form.add_group(t("users.admin.user_form.institution"));
        form.add_checkbox("is_institution", t("users.admin.user_form.is_institution"));
        form.add_text(
            "institution_name",
            t("users.admin.user_form.institution_name.label"),
        )
        .placeholder(t("users.admin.user_form.institution_name.placeholder"))
        .required_if(
            "is_institution",
            t("users.admin.user_form.institution_name.required"),
        );

        for provider in &self.providers {
            form = provider.provide(form, user.as_ref());
        }

        form.add_group(t("users.admin.user_form.other"));
        form.add_text("ext_id", t("users.admin.user_form.external_id.label"))
            .placeholder(t("users.admin.user_form.external_id.placeholder"))
            .integer(t("users.admin.user_form.external_id.integer"));
        let roles = Role::ALL
            .iter()
            .map(|role| SelectOption {
                value: role.as_str().to_string(),
                label: t(&format!("users.admin.user_form.role.{}", role.as_str())),
            })
            .collect();
        form.add_select("role", t("users.admin.user_form.role.label"), roles);
        form.add_checkbox("active", t("users.admin.user_form.active"));
        form.set_submit_label(t("users.admin.user_form.submit"));

        if let Some(user) = &user {
            form.add_hidden("user_id");
            form.set_defaults(&defaults_for(user));
        }

        Ok(form)
    }

    /// Validate and persist a filled form.
    ///
    /// Returns `None` when the form carries errors afterwards; callbacks run
    /// only after the row was written.
    pub async fn submit(&self, form: &mut Form) -> Result<Option<UserFormOutcome>> {
        if !form.validate() {
            return Ok(None);
        }

        let Some(role) = self.parse_role(form) else {
            return Ok(None);
        };
        let Some(ext_id) = self.parse_ext_id(form) else {
            return Ok(None);
        };

        let user_id = form.value("user_id").map(str::parse::<i32>).transpose();
        let user_id = user_id.context("Hidden user_id is not a number")?;

        let outcome = match user_id {
            Some(id) => self.update(form, id, role, ext_id).await?,
            None => self.insert(form, role, ext_id).await?,
        };

        match &outcome {
            Some(UserFormOutcome::Updated(user)) => {
                if let Some(callback) = &self.on_update {
                    callback(form, user);
                }
            }
            Some(UserFormOutcome::Created(user)) => {
                if let Some(callback) = &self.on_save {
                    callback(form, user);
                }
            }
            None => {}
        }

        Ok(outcome)
    }

    fn parse_role(&self, form: &mut Form) -> Option<Role> {
        match form.value("role") {
            None => Some(Role::default()),
            Some(raw) => {
                if let Ok(role) = raw.parse::<Role>() {
                    Some(role)
                } else {
                    form.add_error(
                        "role",
                        self.translator.translate("users.admin.user_form.role.invalid"),
                    );
                    None
                }
            }
        }
    }

    /// `Some(None)` for an empty field, `None` when the value does not fit.
    fn parse_ext_id(&self, form: &mut Form) -> Option<Option<i32>> {
        match form.value("ext_id").map(str::parse::<i32>) {
            None => Some(None),
            Some(Ok(id)) => Some(Some(id)),
            Some(Err(_)) => {
                form.add_error(
                    "ext_id",
                    self.translator
                        .translate("users.admin.user_form.external_id.integer"),
                );
                None
            }
        }
    }

    async fn update(
        &self,
        form: &mut Form,
        user_id: i32,
        role: Role,
        ext_id: Option<i32>,
    ) -> Result<Option<UserFormOutcome>> {
        // A blank password keeps the stored hash.
        let password_hash = match form.value("password") {
            Some(password) => Some(self.passwords.hash_blocking(password).await?),
            None => None,
        };

        let changes = UserChanges {
            email: form.value("email").unwrap_or_default().to_string(),
            password_hash,
            first_name: form.value("first_name").map(str::to_string),
            last_name: form.value("last_name").map(str::to_string),
            role,
            active: form.is_checked("active"),
            is_institution: form.is_checked("is_institution"),
            institution_name: form.value("institution_name").map(str::to_string),
            ext_id,
        };

        match self.store.update_user(user_id, changes).await {
            Ok(user) => {
                info!(user_id, "User updated from profile form");
                let _ = self.event_bus.send(UserEvent::UserUpdated { user_id });
                Ok(Some(UserFormOutcome::Updated(user)))
            }
            Err(UserWriteError::DuplicateEmail(_)) => {
                form.add_error(
                    "email",
                    self.translator
                        .translate("users.admin.user_form.email.duplicate"),
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(
        &self,
        form: &mut Form,
        role: Role,
        ext_id: Option<i32>,
    ) -> Result<Option<UserFormOutcome>> {
        let builder = UserBuilder::new(
            self.store.clone(),
            self.passwords,
            self.event_bus.clone(),
        )
        .email(form.value("email").unwrap_or_default())
        .password(form.value("password").unwrap_or_default())
        .first_name(form.value("first_name").map(str::to_string))
        .last_name(form.value("last_name").map(str::to_string))
        .role(role)
        .active(form.is_checked("active"))
        .ext_id(ext_id)
        .institution(
            form.is_checked("is_institution"),
            form.value("institution_name").map(str::to_string),
        )
        .source(SOURCE_BACKEND);

        match builder.save().await {
            Ok(user) => Ok(Some(UserFormOutcome::Created(user))),
            Err(UserBuilderError::Validation(errors)) => {
                form.add_error("email", errors.join("\n"));
                Ok(None)
            }
            Err(UserBuilderError::Internal(e)) => Err(anyhow::anyhow!(e)),
        }
    }
}

/// Form defaults for an existing user. The password is never prefilled.
fn defaults_for(user: &User) -> HashMap<String, String> {
    let flag = |b: bool| if b { "1" } else { "" }.to_string();

    let mut defaults = HashMap::from([
        ("user_id".to_string(), user.id.to_string()),
        ("email".to_string(), user.email.clone()),
        ("role".to_string(), user.role.as_str().to_string()),
        ("active".to_string(), flag(user.active)),
        ("is_institution".to_string(), flag(user.is_institution)),
    ]);

    let optional = [
        ("first_name", user.first_name.clone()),
        ("last_name", user.last_name.clone()),
        ("institution_name", user.institution_name.clone()),
        ("ext_id", user.ext_id.map(|id| id.to_string())),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            defaults.insert(name.to_string(), value);
        }
    }

    defaults
}
