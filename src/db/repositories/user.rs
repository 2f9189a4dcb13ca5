use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::Role;
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub active: bool,
    pub confirmed_at: Option<String>,
    pub role: Role,
    pub is_institution: bool,
    pub institution_name: Option<String>,
    pub ext_id: Option<i32>,
    pub source: String,
    pub current_sign_in_at: Option<String>,
    pub last_sign_in_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            active: model.active,
            confirmed_at: model.confirmed_at,
            role: model.role.parse().unwrap_or_default(),
            is_institution: model.is_institution,
            institution_name: model.institution_name,
            ext_id: model.ext_id,
            source: model.source,
            current_sign_in_at: model.current_sign_in_at,
            last_sign_in_at: model.last_sign_in_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Columns of a new user row. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub active: bool,
    pub is_institution: bool,
    pub institution_name: Option<String>,
    pub ext_id: Option<i32>,
    pub source: String,
}

/// Profile columns applied by an edit. `password_hash: None` keeps the stored hash.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub active: bool,
    pub is_institution: bool,
    pub institution_name: Option<String>,
    pub ext_id: Option<i32>,
}

#[derive(Debug, Error)]
pub enum UserWriteError {
    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("User not found: {0}")]
    NotFound(i32),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

fn map_write_error(err: DbErr, email: &str) -> UserWriteError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        UserWriteError::DuplicateEmail(email.to_string())
    } else {
        UserWriteError::Database(err)
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find_model_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.find_model_by_email(email).await?.map(User::from))
    }

    /// Get user by email together with the stored password hash
    pub async fn get_by_email_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        Ok(self.find_model_by_email(email).await?.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn get_password_hash(&self, id: i32) -> Result<Option<String>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user password hash")?;

        Ok(user.map(|u| u.password_hash))
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_model_by_email(email).await?.is_some())
    }

    pub async fn insert(&self, new_user: NewUser) -> Result<User, UserWriteError> {
        let now = chrono::Utc::now().to_rfc3339();
        let email = new_user.email.clone();

        let active = users::ActiveModel {
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            active: Set(new_user.active),
            confirmed_at: Set(None),
            role: Set(new_user.role.as_str().to_string()),
            is_institution: Set(new_user.is_institution),
            institution_name: Set(new_user.institution_name),
            ext_id: Set(new_user.ext_id),
            source: Set(new_user.source),
            current_sign_in_at: Set(None),
            last_sign_in_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .map_err(|e| map_write_error(e, &email))?;

        Ok(User::from(model))
    }

    /// Apply profile changes. A taken email surfaces as [`UserWriteError::DuplicateEmail`].
    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<User, UserWriteError> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or(UserWriteError::NotFound(id))?;

        let email = changes.email.clone();
        let mut active: users::ActiveModel = user.into();
        active.email = Set(changes.email);
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(hash);
        }
        active.first_name = Set(changes.first_name);
        active.last_name = Set(changes.last_name);
        active.role = Set(changes.role.as_str().to_string());
        active.active = Set(changes.active);
        active.is_institution = Set(changes.is_institution);
        active.institution_name = Set(changes.institution_name);
        active.ext_id = Set(changes.ext_id);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .map_err(|e| map_write_error(e, &email))?;

        Ok(User::from(model))
    }

    pub async fn update_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Shift `current_sign_in_at` into `last_sign_in_at` and stamp now.
    pub async fn add_sign_in(&self, id: i32) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for sign-in")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let previous = user.current_sign_in_at.clone();
        let mut active: users::ActiveModel = user.into();
        active.last_sign_in_at = Set(previous);
        active.current_sign_in_at = Set(Some(chrono::Utc::now().to_rfc3339()));
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn confirm(&self, id: i32) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for confirmation")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let now = chrono::Utc::now().to_rfc3339();
        let mut active: users::ActiveModel = user.into();
        active.confirmed_at = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }
}
