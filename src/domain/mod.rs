//! Domain types for user management.
//!
//! Newtypes and enums shared by the authenticator, the forms and the API so
//! that raw strings (`"ok"`, `"admin"`) stay at the storage boundary.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of a user row.
///
/// # Examples
///
/// ```rust
/// use crm_users::domain::UserId;
///
/// let id = UserId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "UserId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i32 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Account role. Stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub const ALL: [Self; 2] = [Self::User, Self::Admin];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Outcome recorded for every authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    NotFoundEmail,
    WrongPass,
    InactiveUser,
    Ok,
    ApiOk,
    LoginAfterSignUp,
}

impl LoginStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFoundEmail => "not_found_email",
            Self::WrongPass => "wrong_pass",
            Self::InactiveUser => "inactive_user",
            Self::Ok => "ok",
            Self::ApiOk => "api_ok",
            Self::LoginAfterSignUp => "login_after_sign_up",
        }
    }

    /// Whether the attempt ended with a resolved identity.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::ApiOk | Self::LoginAfterSignUp)
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found_email" => Ok(Self::NotFoundEmail),
            "wrong_pass" => Ok(Self::WrongPass),
            "inactive_user" => Ok(Self::InactiveUser),
            "ok" => Ok(Self::Ok),
            "api_ok" => Ok(Self::ApiOk),
            "login_after_sign_up" => Ok(Self::LoginAfterSignUp),
            other => Err(format!("Unknown login status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_conversions() {
        let id = UserId::new(7);
        assert_eq!(id.value(), 7);
        assert_eq!(i32::from(id), 7);
        assert_eq!(UserId::from(7), id);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn login_status_storage_names() {
        assert_eq!(LoginStatus::NotFoundEmail.as_str(), "not_found_email");
        assert_eq!(LoginStatus::LoginAfterSignUp.to_string(), "login_after_sign_up");
        assert_eq!("api_ok".parse::<LoginStatus>().unwrap(), LoginStatus::ApiOk);
    }

    #[test]
    fn only_resolved_statuses_count_as_success() {
        assert!(LoginStatus::Ok.is_success());
        assert!(LoginStatus::ApiOk.is_success());
        assert!(LoginStatus::LoginAfterSignUp.is_success());
        assert!(!LoginStatus::WrongPass.is_success());
        assert!(!LoginStatus::InactiveUser.is_success());
        assert!(!LoginStatus::NotFoundEmail.is_success());
    }
}
