pub mod prelude;

pub mod access_tokens;
pub mod addresses;
pub mod countries;
pub mod login_attempts;
pub mod password_reset_tokens;
pub mod system_logs;
pub mod users;
