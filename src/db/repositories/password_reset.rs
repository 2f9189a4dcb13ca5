use crate::entities::{password_reset_tokens, prelude::*};
use crate::services::password::generate_token;
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

pub struct PasswordResetRepository {
    conn: DatabaseConnection,
}

impl PasswordResetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i32,
        ttl_minutes: i64,
    ) -> Result<password_reset_tokens::Model> {
        let now = chrono::Utc::now();
        let expires_at = chrono::Duration::try_minutes(ttl_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .with_context(|| format!("Password reset TTL out of range: {ttl_minutes} minutes"))?;

        let active_model = password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(generate_token()),
            created_at: Set(now.to_rfc3339()),
            expires_at: Set(expires_at.to_rfc3339()),
            used_at: Set(None),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to create password reset token")
    }

    pub async fn latest_for_user(
        &self,
        user_id: i32,
    ) -> Result<Option<password_reset_tokens::Model>> {
        PasswordResetTokens::find()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .order_by_desc(password_reset_tokens::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")
    }
}
