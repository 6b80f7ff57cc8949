use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use courier_shared::models::AuditEvent;

use crate::models::Order;
use crate::shipment::{NewShipment, ShipmentUpdate, ShipmentWrite};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Read access to orders together with their delivery context.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Loads the order with its current shipment, customer and the store's
    /// delivery settings in a single read.
    async fn load_order_with_context(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;
}

#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Create-or-update keyed on the order reference. Concurrent writers for
    /// the same order converge on one row. The update is only applied when
    /// [`ShipmentUpdate::allowed_from`] accepts the stored status, checked
    /// against the row as stored rather than any earlier read.
    async fn upsert_shipment(
        &self,
        order_id: Uuid,
        create: NewShipment,
        update: ShipmentUpdate,
    ) -> Result<ShipmentWrite, StoreError>;
}

/// Fire-and-forget audit trail. Callers log failures and carry on.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError>;
}

/// Serializes dispatch attempts per order.
#[async_trait]
pub trait DispatchLock: Send + Sync {
    /// Returns `false` when another holder owns the lock.
    async fn try_acquire(&self, order_id: Uuid, token: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Releases the lock only if `token` still owns it.
    async fn release(&self, order_id: Uuid, token: &str) -> Result<(), StoreError>;
}
