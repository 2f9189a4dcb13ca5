use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only audit row, one per authentication attempt.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "login_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Username exactly as submitted.
    #[sea_orm(indexed)]
    pub email: String,

    pub user_id: Option<i32>,

    pub source: String,

    pub status: String,

    pub message: Option<String>,

    pub ip: Option<String>,

    pub user_agent: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
