use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{access_tokens, addresses, countries, login_attempts, password_reset_tokens};

pub mod migrator;
pub mod repositories;

pub use crate::entities::system_logs::Model as SystemLog;
pub use repositories::address::NewAddress;
pub use repositories::login_attempt::NewLoginAttempt;
pub use repositories::user::{NewUser, User, UserChanges, UserWriteError};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn login_attempt_repo(&self) -> repositories::login_attempt::LoginAttemptRepository {
        repositories::login_attempt::LoginAttemptRepository::new(self.conn.clone())
    }

    fn address_repo(&self) -> repositories::address::AddressRepository {
        repositories::address::AddressRepository::new(self.conn.clone())
    }

    fn access_token_repo(&self) -> repositories::access_token::AccessTokenRepository {
        repositories::access_token::AccessTokenRepository::new(self.conn.clone())
    }

    fn password_reset_repo(&self) -> repositories::password_reset::PasswordResetRepository {
        repositories::password_reset::PasswordResetRepository::new(self.conn.clone())
    }

    fn logs_repo(&self) -> repositories::logs::LogRepository {
        repositories::logs::LogRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn user_email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn insert_user(&self, user: NewUser) -> Result<User, UserWriteError> {
        self.user_repo().insert(user).await
    }

    pub async fn update_user(&self, id: i32, changes: UserChanges) -> Result<User, UserWriteError> {
        self.user_repo().update(id, changes).await
    }

    pub async fn update_user_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        self.user_repo().update_password_hash(id, password_hash).await
    }

    pub async fn add_user_sign_in(&self, id: i32) -> Result<()> {
        self.user_repo().add_sign_in(id).await
    }

    pub async fn confirm_user(&self, id: i32) -> Result<()> {
        self.user_repo().confirm(id).await
    }

    // ========== Login attempts ==========

    pub async fn add_login_attempt(&self, attempt: NewLoginAttempt) -> Result<()> {
        self.login_attempt_repo().add(attempt).await
    }

    pub async fn list_login_attempts(
        &self,
        email: &str,
        limit: u64,
    ) -> Result<Vec<login_attempts::Model>> {
        self.login_attempt_repo().list_for_email(email, limit).await
    }

    pub async fn count_login_attempts(&self, email: &str) -> Result<u64> {
        self.login_attempt_repo().count_for_email(email).await
    }

    // ========== Addresses ==========

    pub async fn add_address(&self, address: NewAddress) -> Result<addresses::Model> {
        self.address_repo().add(address).await
    }

    pub async fn get_address(&self, id: i32) -> Result<Option<addresses::Model>> {
        self.address_repo().get(id).await
    }

    pub async fn list_addresses_with_country(
        &self,
        user_id: i32,
    ) -> Result<Vec<(addresses::Model, Option<countries::Model>)>> {
        self.address_repo().list_for_user_with_country(user_id).await
    }

    pub async fn count_addresses(&self, user_id: i32) -> Result<u64> {
        self.address_repo().count_for_user(user_id).await
    }

    pub async fn anonymize_addresses(&self, user_id: i32, protected_ids: &[i32]) -> Result<u64> {
        self.address_repo()
            .anonymize_for_user(user_id, protected_ids)
            .await
    }

    pub async fn add_country(&self, name: &str, iso_code: &str) -> Result<countries::Model> {
        self.address_repo().add_country(name, iso_code).await
    }

    // ========== Tokens ==========

    pub async fn create_access_token(
        &self,
        user_id: i32,
        source: Option<String>,
        source_data: Option<serde_json::Value>,
    ) -> Result<access_tokens::Model> {
        self.access_token_repo()
            .create(user_id, source, source_data)
            .await
    }

    pub async fn resolve_access_token(
        &self,
        token: &str,
    ) -> Result<Option<(access_tokens::Model, User)>> {
        Ok(self
            .access_token_repo()
            .resolve(token)
            .await?
            .map(|(token, user)| (token, User::from(user))))
    }

    pub async fn create_password_reset_token(
        &self,
        user_id: i32,
        ttl_minutes: i64,
    ) -> Result<password_reset_tokens::Model> {
        self.password_reset_repo().create(user_id, ttl_minutes).await
    }

    pub async fn latest_password_reset_token(
        &self,
        user_id: i32,
    ) -> Result<Option<password_reset_tokens::Model>> {
        self.password_reset_repo().latest_for_user(user_id).await
    }

    // ========== System logs ==========

    pub async fn add_log(
        &self,
        event_type: &str,
        level: &str,
        message: &str,
        user_id: Option<i32>,
        details: Option<String>,
    ) -> Result<()> {
        self.logs_repo()
            .add(event_type, level, message, user_id, details)
            .await
    }

    pub async fn list_logs_for_user(&self, user_id: i32) -> Result<Vec<SystemLog>> {
        self.logs_repo().list_for_user(user_id).await
    }
}
