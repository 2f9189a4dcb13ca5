use crate::domain::LoginStatus;
use crate::entities::{login_attempts, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// One authentication attempt as handed to the audit log.
#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub email: String,
    pub user_id: Option<i32>,
    pub source: String,
    pub status: LoginStatus,
    pub message: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, attempt: NewLoginAttempt) -> Result<()> {
        let active_model = login_attempts::ActiveModel {
            email: Set(attempt.email),
            user_id: Set(attempt.user_id),
            source: Set(attempt.source),
            status: Set(attempt.status.as_str().to_string()),
            message: Set(attempt.message),
            ip: Set(attempt.ip),
            user_agent: Set(attempt.user_agent),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        LoginAttempts::insert(active_model)
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to record login attempt")?;
        Ok(())
    }

    /// Most recent attempts first.
    pub async fn list_for_email(
        &self,
        email: &str,
        limit: u64,
    ) -> Result<Vec<login_attempts::Model>> {
        LoginAttempts::find()
            .filter(login_attempts::Column::Email.eq(email))
            .order_by_desc(login_attempts::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list login attempts")
    }

    pub async fn count_for_email(&self, email: &str) -> Result<u64> {
        LoginAttempts::find()
            .filter(login_attempts::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count login attempts")
    }
}
