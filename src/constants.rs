/// Placeholder written over personal data by GDPR erasure.
pub const GDPR_REMOVAL: &str = "GDPR removal";

/// Source tag of users created from the admin profile form.
pub const SOURCE_BACKEND: &str = "backend";

/// Source tag of API logins when the client does not name one.
pub const SOURCE_API: &str = "api";

/// Source tag of logins coming from the web frontend.
pub const SOURCE_WEB: &str = "web";

pub mod limits {

    pub const DEFAULT_LOGIN_ATTEMPTS_LIMIT: u64 = 20;

    /// Length in bytes of random tokens before hex encoding.
    pub const TOKEN_BYTES: usize = 32;

    /// Upper bound for `security.password_reset_token_ttl_minutes` (one year).
    pub const MAX_PASSWORD_RESET_TTL_MINUTES: i64 = 365 * 24 * 60;
}
