use crate::db::Store;
use crate::domain::events::UserEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

/// Persists user events into `system_logs`.
pub struct LogService {
    store: Store,
    event_bus: broadcast::Sender<UserEvent>,
}

impl LogService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<UserEvent>) -> Self {
        Self { store, event_bus }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle_event(event).await {
                            error!(error = %e, "Failed to save log");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        error!(count, "Log listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        });
    }

    pub async fn handle_event(&self, event: UserEvent) -> anyhow::Result<()> {
        let (level, message) = match &event {
            UserEvent::SignedIn { source, status, .. } => {
                ("info", format!("User signed in via {source} ({status})"))
            }
            UserEvent::LoginFailed {
                email,
                source,
                status,
            } => (
                "warn",
                format!("Login failed for {email} via {source} ({status})"),
            ),
            UserEvent::UserConfirmed { .. } => ("info", "User account confirmed".to_string()),
            UserEvent::PasswordRehashed { .. } => {
                ("info", "Password hash upgraded".to_string())
            }
            UserEvent::UserCreated { source, .. } => {
                ("success", format!("User created from {source}"))
            }
            UserEvent::UserUpdated { .. } => ("info", "User profile updated".to_string()),
            UserEvent::PasswordResetRequested { .. } => {
                ("info", "Password reset requested".to_string())
            }
            UserEvent::AddressesAnonymized { count, .. } => {
                ("warn", format!("GDPR removal applied to {count} addresses"))
            }
        };

        self.store
            .add_log(
                event.event_type(),
                level,
                &message,
                event.user_id(),
                Some(serde_json::to_string(&event)?),
            )
            .await
    }
}
