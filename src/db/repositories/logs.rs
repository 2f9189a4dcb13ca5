use crate::entities::{prelude::*, system_logs};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

pub struct LogRepository {
    conn: DatabaseConnection,
}

impl LogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        event_type: &str,
        level: &str,
        message: &str,
        user_id: Option<i32>,
        details: Option<String>,
    ) -> Result<()> {
        let active_model = system_logs::ActiveModel {
            event_type: Set(event_type.to_string()),
            level: Set(level.to_string()),
            message: Set(message.to_string()),
            user_id: Set(user_id),
            details: Set(details),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        SystemLogs::insert(active_model)
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<system_logs::Model>> {
        let logs = SystemLogs::find()
            .filter(system_logs::Column::UserId.eq(user_id))
            .order_by_asc(system_logs::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(logs)
    }
}
