use anyhow::Result;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::db::Store;
use crate::domain::UserId;
use crate::domain::events::UserEvent;
use crate::entities::{addresses, countries};
use crate::services::user_data::{Attachment, UserDataProvider};

/// One address as it appears in a user's data export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressExport {
    #[serde(rename = "type")]
    pub address_type: String,
    pub created_at: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub number: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ico: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icdph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Timestamps are exported as RFC 3339 with whole seconds.
fn export_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false),
    )
}

impl AddressExport {
    fn from_row(address: addresses::Model, country: Option<countries::Model>) -> Self {
        Self {
            address_type: address.address_type,
            created_at: export_timestamp(&address.created_at),
            first_name: address.first_name,
            last_name: address.last_name,
            address: address.address,
            number: address.number,
            city: address.city,
            zip: address.zip,
            phone_number: address.phone_number,
            country: country.map(|c| c.name),
            ico: non_empty(address.ico),
            dic: non_empty(address.dic),
            icdph: non_empty(address.icdph),
            company_name: non_empty(address.company_name),
        }
    }
}

pub struct AddressesUserDataProvider {
    store: Store,
    event_bus: broadcast::Sender<UserEvent>,
}

impl AddressesUserDataProvider {
    pub const IDENTIFIER: &'static str = "addresses";

    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<UserEvent>) -> Self {
        Self { store, event_bus }
    }

    pub async fn export(&self, user_id: UserId) -> Result<Vec<AddressExport>> {
        let rows = self
            .store
            .list_addresses_with_country(user_id.value())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(address, country)| AddressExport::from_row(address, country))
            .collect())
    }
}

#[async_trait]
impl UserDataProvider for AddressesUserDataProvider {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    async fn data(&self, _user_id: UserId) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn download(&self, user_id: UserId) -> Result<Value> {
        Ok(serde_json::to_value(self.export(user_id).await?)?)
    }

    async fn download_attachments(&self, _user_id: UserId) -> Result<Vec<Attachment>> {
        Ok(Vec::new())
    }

    async fn protect(&self, _user_id: UserId) -> Result<Vec<i32>> {
        Ok(Vec::new())
    }

    async fn can_be_deleted(&self, _user_id: UserId) -> Result<(bool, Option<String>)> {
        Ok((true, None))
    }

    async fn delete(&self, user_id: UserId, protected_ids: &[i32]) -> Result<()> {
        let count = self
            .store
            .anonymize_addresses(user_id.value(), protected_ids)
            .await?;

        let _ = self.event_bus.send(UserEvent::AddressesAnonymized {
            user_id: user_id.value(),
            count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_drop_fractional_seconds() {
        assert_eq!(
            export_timestamp("2024-05-01T10:20:30.123456789+00:00"),
            "2024-05-01T10:20:30+00:00"
        );
        assert_eq!(export_timestamp("garbage"), "garbage");
    }

    #[test]
    fn optional_keys_are_omitted_when_empty() {
        let export = AddressExport {
            address_type: "invoice".into(),
            created_at: "2024-05-01T10:20:30+00:00".into(),
            first_name: Some("Jane".into()),
            last_name: None,
            address: None,
            number: None,
            city: None,
            zip: None,
            phone_number: None,
            country: None,
            ico: non_empty(Some(String::new())),
            dic: None,
            icdph: None,
            company_name: Some("ACME".into()),
        };

        let json = serde_json::to_value(&export).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["type"], "invoice");
        assert!(obj.contains_key("last_name"));
        assert!(obj["last_name"].is_null());
        assert!(!obj.contains_key("country"));
        assert!(!obj.contains_key("ico"));
        assert_eq!(obj["company_name"], "ACME");
    }
}
