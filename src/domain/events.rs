//! Domain events for user management.
//!
//! Services publish these on a broadcast bus; `LogService` persists them to
//! `system_logs`. Publishing never fails a request: a bus without receivers
//! simply drops the event.

use serde::Serialize;

use crate::domain::LoginStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum UserEvent {
    SignedIn {
        user_id: i32,
        source: String,
        status: LoginStatus,
    },
    LoginFailed {
        email: String,
        source: String,
        status: LoginStatus,
    },
    UserConfirmed {
        user_id: i32,
    },
    PasswordRehashed {
        user_id: i32,
    },
    UserCreated {
        user_id: i32,
        source: String,
    },
    UserUpdated {
        user_id: i32,
    },
    PasswordResetRequested {
        user_id: i32,
    },
    AddressesAnonymized {
        user_id: i32,
        count: u64,
    },
}

impl UserEvent {
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "SignedIn",
            Self::LoginFailed { .. } => "LoginFailed",
            Self::UserConfirmed { .. } => "UserConfirmed",
            Self::PasswordRehashed { .. } => "PasswordRehashed",
            Self::UserCreated { .. } => "UserCreated",
            Self::UserUpdated { .. } => "UserUpdated",
            Self::PasswordResetRequested { .. } => "PasswordResetRequested",
            Self::AddressesAnonymized { .. } => "AddressesAnonymized",
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<i32> {
        match self {
            Self::SignedIn { user_id, .. }
            | Self::UserConfirmed { user_id }
            | Self::PasswordRehashed { user_id }
            | Self::UserCreated { user_id, .. }
            | Self::UserUpdated { user_id }
            | Self::PasswordResetRequested { user_id }
            | Self::AddressesAnonymized { user_id, .. } => Some(*user_id),
            Self::LoginFailed { .. } => None,
        }
    }
}
