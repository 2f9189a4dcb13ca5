//! Per-module GDPR data providers.
//!
//! Each module that stores personal data registers a [`UserDataProvider`].
//! The [`UserDataRegistry`] fans export and erasure requests out to every
//! provider in registration order.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::UserId;

/// A file that belongs to a user's data export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[async_trait]
pub trait UserDataProvider: Send + Sync {
    /// Key under which this provider's export appears.
    fn identifier(&self) -> &'static str;

    /// Data shown to the user inside the application, if any.
    async fn data(&self, user_id: UserId) -> Result<Option<Value>>;

    /// Machine-readable export of everything this provider stores.
    async fn download(&self, user_id: UserId) -> Result<Value>;

    async fn download_attachments(&self, user_id: UserId) -> Result<Vec<Attachment>>;

    /// Ids of rows that must survive erasure, e.g. because of legal retention.
    async fn protect(&self, user_id: UserId) -> Result<Vec<i32>>;

    /// `(false, Some(reason))` vetoes erasure of the whole account.
    async fn can_be_deleted(&self, user_id: UserId) -> Result<(bool, Option<String>)>;

    /// Erase personal data, leaving rows listed in `protected_ids` untouched.
    async fn delete(&self, user_id: UserId, protected_ids: &[i32]) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct UserDataRegistry {
    providers: Vec<Arc<dyn UserDataProvider>>,
}

impl UserDataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn UserDataProvider>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn identifiers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.identifier()).collect()
    }

    /// Export of every provider keyed by its identifier.
    pub async fn download_all(&self, user_id: UserId) -> Result<Map<String, Value>> {
        let mut export = Map::new();
        for provider in &self.providers {
            let data = provider.download(user_id).await?;
            export.insert(provider.identifier().to_string(), data);
        }
        Ok(export)
    }

    pub async fn attachments_all(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(&'static str, Attachment)>> {
        let mut all = Vec::new();
        for provider in &self.providers {
            for attachment in provider.download_attachments(user_id).await? {
                all.push((provider.identifier(), attachment));
            }
        }
        Ok(all)
    }

    /// Providers refusing erasure, with their reasons.
    pub async fn deletion_blockers(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(&'static str, Option<String>)>> {
        let mut blockers = Vec::new();
        for provider in &self.providers {
            let (allowed, reason) = provider.can_be_deleted(user_id).await?;
            if !allowed {
                blockers.push((provider.identifier(), reason));
            }
        }
        Ok(blockers)
    }

    /// Erase the user's data in every provider.
    ///
    /// Refuses to touch anything while any provider vetoes the erasure. Each
    /// provider is asked for its own protected ids.
    pub async fn delete_all(&self, user_id: UserId) -> Result<()> {
        let blockers = self.deletion_blockers(user_id).await?;
        if !blockers.is_empty() {
            let reasons = blockers
                .iter()
                .map(|(id, reason)| format!("{id}: {}", reason.as_deref().unwrap_or("no reason given")))
                .collect::<Vec<_>>()
                .join(", ");
            warn!(user_id = %user_id, reasons = %reasons, "User data erasure refused");
            anyhow::bail!("User data cannot be deleted ({reasons})");
        }

        for provider in &self.providers {
            let protected = provider.protect(user_id).await?;
            provider.delete(user_id, &protected).await?;
            info!(
                user_id = %user_id,
                provider = provider.identifier(),
                protected = protected.len(),
                "User data erased"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        veto: Option<&'static str>,
        protected: Vec<i32>,
        deleted_with: Mutex<Option<Vec<i32>>>,
    }

    #[async_trait]
    impl UserDataProvider for Recording {
        fn identifier(&self) -> &'static str {
            "recording"
        }

        async fn data(&self, _user_id: UserId) -> Result<Option<Value>> {
            Ok(None)
        }

        async fn download(&self, user_id: UserId) -> Result<Value> {
            Ok(serde_json::json!({ "user": user_id.value() }))
        }

        async fn download_attachments(&self, _user_id: UserId) -> Result<Vec<Attachment>> {
            Ok(vec![Attachment {
                file_name: "a.txt".into(),
                content_type: "text/plain".into(),
                content: b"a".to_vec(),
            }])
        }

        async fn protect(&self, _user_id: UserId) -> Result<Vec<i32>> {
            Ok(self.protected.clone())
        }

        async fn can_be_deleted(&self, _user_id: UserId) -> Result<(bool, Option<String>)> {
            Ok(match self.veto {
                Some(reason) => (false, Some(reason.to_string())),
                None => (true, None),
            })
        }

        async fn delete(&self, _user_id: UserId, protected_ids: &[i32]) -> Result<()> {
            *self.deleted_with.lock().unwrap() = Some(protected_ids.to_vec());
            Ok(())
        }
    }

    fn recording(veto: Option<&'static str>, protected: Vec<i32>) -> Arc<Recording> {
        Arc::new(Recording {
            veto,
            protected,
            deleted_with: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn download_all_keys_by_identifier() {
        let mut registry = UserDataRegistry::new();
        registry.register(recording(None, vec![]));

        let export = registry.download_all(UserId::new(3)).await.unwrap();
        assert_eq!(export["recording"]["user"], 3);

        let attachments = registry.attachments_all(UserId::new(3)).await.unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].0, "recording");
    }

    #[tokio::test]
    async fn delete_all_passes_provider_protected_ids() {
        let provider = recording(None, vec![4, 9]);
        let mut registry = UserDataRegistry::new();
        registry.register(provider.clone());

        registry.delete_all(UserId::new(1)).await.unwrap();
        assert_eq!(*provider.deleted_with.lock().unwrap(), Some(vec![4, 9]));
    }

    #[tokio::test]
    async fn veto_blocks_every_provider() {
        let vetoing = recording(Some("open invoices"), vec![]);
        let other = recording(None, vec![]);
        let mut registry = UserDataRegistry::new();
        registry.register(vetoing);
        registry.register(other.clone());

        let err = registry.delete_all(UserId::new(1)).await.unwrap_err();
        assert!(err.to_string().contains("open invoices"));
        assert!(other.deleted_with.lock().unwrap().is_none());
    }
}
