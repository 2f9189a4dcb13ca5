pub mod access_token;
pub mod address;
pub mod login_attempt;
pub mod logs;
pub mod password_reset;
pub mod user;
