pub use super::access_tokens::Entity as AccessTokens;
pub use super::addresses::Entity as Addresses;
pub use super::countries::Entity as Countries;
pub use super::login_attempts::Entity as LoginAttempts;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::system_logs::Entity as SystemLogs;
pub use super::users::Entity as Users;
