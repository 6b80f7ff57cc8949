use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;
use std::str::FromStr;

use crate::shipment::Shipment;
use crate::CoreError;

/// Where the order confirmation that triggered dispatch came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Storefront,
    #[serde(alias = "whatsapp")]
    Messaging,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Storefront => "storefront",
            Channel::Messaging => "messaging",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchMode {
    /// Staff confirm a draft shipment before any courier is contacted.
    Confirm,
    /// The courier is contacted as soon as the order is ready.
    Auto,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Confirm => "CONFIRM",
            DispatchMode::Auto => "AUTO",
        }
    }
}

impl FromStr for DispatchMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRM" => Ok(DispatchMode::Confirm),
            "AUTO" => Ok(DispatchMode::Auto),
            other => Err(CoreError::ValidationError(format!("Unknown dispatch mode: {}", other))),
        }
    }
}

/// Configured courier for a store. Unknown keys are kept verbatim so that a
/// store pointing at a courier this build does not know still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    Manual,
    Kwik,
    Other(String),
}

impl ProviderKey {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderKey::Manual => "MANUAL",
            ProviderKey::Kwik => "KWIK",
            ProviderKey::Other(key) => key,
        }
    }

    /// Human-facing name used in blockers and error messages.
    pub fn display_name(&self) -> &str {
        match self {
            ProviderKey::Manual => "Manual",
            ProviderKey::Kwik => "Kwik",
            ProviderKey::Other(key) => key,
        }
    }

    /// Whether dispatching through this courier needs platform credentials.
    pub fn requires_credentials(&self) -> bool {
        matches!(self, ProviderKey::Kwik)
    }
}

impl From<&str> for ProviderKey {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MANUAL" | "CUSTOM" | "" => ProviderKey::Manual,
            "KWIK" => ProviderKey::Kwik,
            _ => ProviderKey::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ProviderKey::from(raw.as_str()))
    }
}

/// Per-store delivery configuration, read-only to the dispatch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    pub store_id: Uuid,
    pub is_enabled: bool,
    pub pickup_name: Option<String>,
    pub pickup_phone: Option<String>,
    pub pickup_address_line1: Option<String>,
    pub pickup_city: Option<String>,
    pub provider: ProviderKey,
    pub auto_dispatch_enabled: bool,
    pub auto_dispatch_storefront: bool,
    pub auto_dispatch_messaging: bool,
    pub auto_dispatch_mode: DispatchMode,
}

impl DeliverySettings {
    /// Settings of a store that has delivery switched on but nothing automated yet.
    pub fn new(store_id: Uuid) -> Self {
        Self {
            store_id,
            is_enabled: true,
            pickup_name: None,
            pickup_phone: None,
            pickup_address_line1: None,
            pickup_city: None,
            provider: ProviderKey::Manual,
            auto_dispatch_enabled: false,
            auto_dispatch_storefront: false,
            auto_dispatch_messaging: false,
            auto_dispatch_mode: DispatchMode::Confirm,
        }
    }

    pub fn auto_dispatch_allowed_for(&self, channel: Channel) -> bool {
        match channel {
            Channel::Storefront => self.auto_dispatch_storefront,
            Channel::Messaging => self.auto_dispatch_messaging,
        }
    }

    pub fn has_pickup_address(&self) -> bool {
        self.pickup_address_line1
            .as_deref()
            .map(|line| !line.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// Order snapshot as loaded with its delivery context in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_number: String,
    pub customer_phone: Option<String>,
    pub shipment: Option<Shipment>,
    pub customer: Option<Customer>,
    pub delivery_settings: Option<DeliverySettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_key_parsing() {
        assert_eq!(ProviderKey::from("KWIK"), ProviderKey::Kwik);
        assert_eq!(ProviderKey::from("kwik"), ProviderKey::Kwik);
        assert_eq!(ProviderKey::from("MANUAL"), ProviderKey::Manual);
        assert_eq!(ProviderKey::from("GIG"), ProviderKey::Other("GIG".to_string()));
        assert!(ProviderKey::Kwik.requires_credentials());
        assert!(!ProviderKey::Manual.requires_credentials());
    }

    #[test]
    fn test_channel_accepts_whatsapp_alias() {
        let channel: Channel = serde_json::from_str("\"whatsapp\"").unwrap();
        assert_eq!(channel, Channel::Messaging);
        assert_eq!(serde_json::to_string(&Channel::Storefront).unwrap(), "\"storefront\"");
    }

    #[test]
    fn test_channel_policy() {
        let mut settings = DeliverySettings::new(Uuid::new_v4());
        settings.auto_dispatch_storefront = true;
        assert!(settings.auto_dispatch_allowed_for(Channel::Storefront));
        assert!(!settings.auto_dispatch_allowed_for(Channel::Messaging));
    }

    #[test]
    fn test_blank_pickup_address_is_missing() {
        let mut settings = DeliverySettings::new(Uuid::new_v4());
        settings.pickup_address_line1 = Some("   ".to_string());
        assert!(!settings.has_pickup_address());
        settings.pickup_address_line1 = Some("12 Admiralty Way".to_string());
        assert!(settings.has_pickup_address());
    }
}
