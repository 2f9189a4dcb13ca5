use sea_orm_migration::prelude::*;

mod m20260301_create_login_attempts;
mod m20260301_create_users;
mod m20260302_create_addresses;
mod m20260303_create_tokens;
mod m20260304_create_system_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_create_users::Migration),
            Box::new(m20260301_create_login_attempts::Migration),
            Box::new(m20260302_create_addresses::Migration),
            Box::new(m20260303_create_tokens::Migration),
            Box::new(m20260304_create_system_logs::Migration),
        ]
    }
}
