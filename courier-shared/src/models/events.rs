use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    DeliveryAutoDispatchPending,
    DeliveryAutoDispatchAttempted,
    DeliveryShipmentCanceled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::DeliveryAutoDispatchPending => "DELIVERY_AUTO_DISPATCH_PENDING",
            AuditAction::DeliveryAutoDispatchAttempted => "DELIVERY_AUTO_DISPATCH_ATTEMPTED",
            AuditAction::DeliveryShipmentCanceled => "DELIVERY_SHIPMENT_CANCELED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditActor {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub label: String,
}

impl AuditActor {
    /// The automated dispatcher, as opposed to store staff.
    pub fn auto_dispatch() -> Self {
        Self {
            kind: "SYSTEM".to_string(),
            id: "auto_dispatch".to_string(),
            label: "AutoDispatch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Uuid,
}

impl AuditEntity {
    pub fn order(id: Uuid) -> Self {
        Self { kind: "ORDER".to_string(), id }
    }

    pub fn shipment(id: Uuid) -> Self {
        Self { kind: "SHIPMENT".to_string(), id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub store_id: Uuid,
    pub actor: AuditActor,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(store_id: Uuid, actor: AuditActor, action: AuditAction, entity: AuditEntity) -> Self {
        Self {
            id: Uuid::new_v4(),
            store_id,
            actor,
            action,
            entity,
            before: None,
            after: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_before(mut self, before: serde_json::Value) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: serde_json::Value) -> Self {
        self.after = Some(after);
        self
    }
}

/// Emitted when a courier accepts a job for an order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShipmentRequestedEvent {
    pub shipment_id: Uuid,
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub provider: String,
    pub channel: String,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    pub timestamp: i64,
}
