use courier_core::{DeliverySettings, Order, ProviderResolver};
use serde::{Deserialize, Serialize};

use crate::resolve;

pub const BLOCKER_DISABLED: &str = "Delivery Disabled";
pub const BLOCKER_PICKUP_MISSING: &str = "Store Pickup Address Missing";
pub const BLOCKER_PHONE_MISSING: &str = "Recipient Phone Missing";
pub const BLOCKER_ADDRESS_MISSING: &str = "Delivery Address Missing";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessStatus {
    Ready,
    NotReadyAddressMissing,
    NotReadyPickupMissing,
    NotReadyProviderMissing,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Readiness {
    pub status: ReadinessStatus,
    pub blockers: Vec<String>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}

/// Blocker categories, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Pickup,
    Provider,
    Recipient,
}

/// Decides whether an order holds enough information to hand to a courier.
///
/// Pure: reads the order snapshot, its settings and which couriers the
/// platform holds credentials for. Every blocker is collected before the
/// verdict is chosen from the highest-priority category present.
pub fn check_readiness(
    order: &Order,
    settings: &DeliverySettings,
    providers: &dyn ProviderResolver,
) -> Readiness {
    if !settings.is_enabled {
        return Readiness {
            status: ReadinessStatus::Disabled,
            blockers: vec![BLOCKER_DISABLED.to_string()],
        };
    }

    let mut blockers: Vec<(Category, String)> = Vec::new();

    if !settings.has_pickup_address() {
        blockers.push((Category::Pickup, BLOCKER_PICKUP_MISSING.to_string()));
    }

    if settings.provider.requires_credentials() && !providers.is_configured(&settings.provider) {
        blockers.push((
            Category::Provider,
            format!("{} Not Configured", settings.provider.display_name()),
        ));
    }

    if resolve::recipient_phone(order).is_none() {
        blockers.push((Category::Recipient, BLOCKER_PHONE_MISSING.to_string()));
    }

    // Reported even when the phone is missing too, so every missing
    // recipient field is named.
    if resolve::address_line1(order).is_none() {
        blockers.push((Category::Recipient, BLOCKER_ADDRESS_MISSING.to_string()));
    }

    let status = match blockers.iter().map(|(category, _)| *category).min() {
        None => ReadinessStatus::Ready,
        Some(Category::Pickup) => ReadinessStatus::NotReadyPickupMissing,
        Some(Category::Provider) => ReadinessStatus::NotReadyProviderMissing,
        Some(Category::Recipient) => ReadinessStatus::NotReadyAddressMissing,
    };

    Readiness {
        status,
        blockers: blockers.into_iter().map(|(_, blocker)| blocker).collect(),
    }
}
