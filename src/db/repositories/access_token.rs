use crate::entities::{access_tokens, prelude::*, users};
use crate::services::password::generate_token;
use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

pub struct AccessTokenRepository {
    conn: DatabaseConnection,
}

impl AccessTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Issue a new bearer token for a user.
    pub async fn create(
        &self,
        user_id: i32,
        source: Option<String>,
        source_data: Option<serde_json::Value>,
    ) -> Result<access_tokens::Model> {
        let active_model = access_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(generate_token()),
            source: Set(source),
            source_data: Set(source_data),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            last_used_at: Set(None),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to create access token")
    }

    /// Look up a token and its owner, stamping `last_used_at` on a hit.
    pub async fn resolve(
        &self,
        token: &str,
    ) -> Result<Option<(access_tokens::Model, users::Model)>> {
        let found = AccessTokens::find()
            .filter(access_tokens::Column::Token.eq(token))
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query access token")?;

        let Some((token_row, Some(user))) = found else {
            return Ok(None);
        };

        let mut active: access_tokens::ActiveModel = token_row.clone().into();
        active.last_used_at = Set(Some(chrono::Utc::now().to_rfc3339()));
        active.update(&self.conn).await?;

        Ok(Some((token_row, user)))
    }
}
