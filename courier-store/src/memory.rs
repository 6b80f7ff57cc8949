//! Process-local store used by tests and by the API when no database is wired.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use courier_core::{
    AuditLog, Customer, DeliverySettings, DispatchLock, NewShipment, Order, OrderStore, Shipment,
    ShipmentStore, ShipmentUpdate, ShipmentWrite, StoreError,
};
use courier_shared::models::AuditEvent;

#[derive(Debug, Clone)]
struct OrderRecord {
    id: Uuid,
    store_id: Uuid,
    order_number: String,
    customer_phone: Option<String>,
    customer_id: Option<Uuid>,
}

#[derive(Default)]
pub struct InMemoryStore {
    orders: RwLock<HashMap<Uuid, OrderRecord>>,
    customers: RwLock<HashMap<Uuid, Customer>>,
    settings: RwLock<HashMap<Uuid, DeliverySettings>>,
    shipments: RwLock<HashMap<Uuid, Shipment>>,
    audit: RwLock<Vec<AuditEvent>>,
    locks: RwLock<HashMap<Uuid, (String, Instant)>>,
    shipment_writes: AtomicUsize,
    fail_audit: AtomicBool,
    fail_shipments: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order. Its shipment, customer and delivery settings are stored
    /// in their own tables, the same way the database splits them.
    pub async fn insert_order(&self, order: Order) {
        let customer_id = order.customer.as_ref().map(|c| c.id);
        if let Some(customer) = order.customer {
            self.customers.write().await.insert(customer.id, customer);
        }
        if let Some(settings) = order.delivery_settings {
            self.put_settings(settings).await;
        }
        if let Some(shipment) = order.shipment {
            self.shipments.write().await.insert(order.id, shipment);
        }

        let record = OrderRecord {
            id: order.id,
            store_id: order.store_id,
            order_number: order.order_number,
            customer_phone: order.customer_phone,
            customer_id,
        };
        self.orders.write().await.insert(record.id, record);
    }

    pub async fn put_settings(&self, settings: DeliverySettings) {
        self.settings.write().await.insert(settings.store_id, settings);
    }

    pub async fn shipment_for(&self, order_id: Uuid) -> Option<Shipment> {
        self.shipments.read().await.get(&order_id).cloned()
    }

    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit.read().await.clone()
    }

    /// Number of upserts served, including no-op ones.
    pub fn shipment_writes(&self) -> usize {
        self.shipment_writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent audit write fail.
    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent shipment upsert fail.
    pub fn fail_shipment_writes(&self, fail: bool) {
        self.fail_shipments.store(fail, Ordering::SeqCst);
    }

    /// Overwrites the stored shipment as a courier callback would.
    pub async fn put_shipment(&self, shipment: Shipment) {
        self.shipments.write().await.insert(shipment.order_id, shipment);
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn load_order_with_context(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let record = match self.orders.read().await.get(&order_id).cloned() {
            Some(record) => record,
            None => return Ok(None),
        };

        let customer = match record.customer_id {
            Some(id) => self.customers.read().await.get(&id).cloned(),
            None => None,
        };

        Ok(Some(Order {
            id: record.id,
            store_id: record.store_id,
            order_number: record.order_number,
            customer_phone: record.customer_phone,
            shipment: self.shipment_for(order_id).await,
            customer,
            delivery_settings: self.settings.read().await.get(&record.store_id).cloned(),
        }))
    }
}

#[async_trait]
impl ShipmentStore for InMemoryStore {
    async fn upsert_shipment(
        &self,
        order_id: Uuid,
        create: NewShipment,
        update: ShipmentUpdate,
    ) -> Result<ShipmentWrite, StoreError> {
        if self.fail_shipments.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("shipment table unavailable".to_string()));
        }
        self.shipment_writes.fetch_add(1, Ordering::SeqCst);

        let mut shipments = self.shipments.write().await;
        match shipments.get_mut(&order_id) {
            Some(existing) => {
                let applied = update.apply(existing);
                Ok(ShipmentWrite { shipment: existing.clone(), applied })
            }
            None => {
                let shipment = create.into_shipment();
                shipments.insert(order_id, shipment.clone());
                Ok(ShipmentWrite { shipment, applied: true })
            }
        }
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("audit log unavailable".to_string()));
        }
        self.audit.write().await.push(event);
        Ok(())
    }
}

#[async_trait]
impl DispatchLock for InMemoryStore {
    async fn try_acquire(&self, order_id: Uuid, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut locks = self.locks.write().await;
        let now = Instant::now();
        if let Some((_, expires_at)) = locks.get(&order_id) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        locks.insert(order_id, (token.to_string(), now + ttl));
        Ok(true)
    }

    async fn release(&self, order_id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut locks = self.locks.write().await;
        if locks.get(&order_id).is_some_and(|(holder, _)| holder == token) {
            locks.remove(&order_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{ProviderKey, ShipmentStatus};

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            order_number: "1001".to_string(),
            customer_phone: Some("+2348012345678".to_string()),
            shipment: None,
            customer: None,
            delivery_settings: None,
        }
    }

    fn draft(order: &Order) -> NewShipment {
        NewShipment {
            store_id: order.store_id,
            order_id: order.id,
            provider: ProviderKey::Manual,
            status: ShipmentStatus::Draft,
            recipient_name: None,
            recipient_phone: None,
            address_line1: None,
            address_city: None,
            tracking_code: None,
            tracking_url: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_converges_on_one_shipment() {
        let store = InMemoryStore::new();
        let order = order();
        store.insert_order(order.clone()).await;

        let first = store.upsert_shipment(order.id, draft(&order), ShipmentUpdate::default()).await.unwrap();
        let update = ShipmentUpdate {
            status: Some(ShipmentStatus::Requested),
            tracking_code: Some("JOB-1".to_string()),
            ..Default::default()
        };
        let second = store.upsert_shipment(order.id, draft(&order), update).await.unwrap();

        assert!(first.applied && second.applied);
        assert_eq!(first.shipment.id, second.shipment.id);
        assert_eq!(second.shipment.status, ShipmentStatus::Requested);
        assert_eq!(store.shipment_writes(), 2);

        let loaded = store.load_order_with_context(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.shipment.unwrap().tracking_code.as_deref(), Some("JOB-1"));
    }

    #[tokio::test]
    async fn test_upsert_keeps_a_shipment_that_moved_on() {
        let store = InMemoryStore::new();
        let order = order();
        store.insert_order(order.clone()).await;

        let mut in_transit = draft(&order).into_shipment();
        in_transit.status = ShipmentStatus::InTransit;
        in_transit.tracking_code = Some("JOB-ORIG".to_string());
        store.put_shipment(in_transit).await;

        let update = ShipmentUpdate {
            status: Some(ShipmentStatus::Requested),
            tracking_code: Some("JOB-NEW".to_string()),
            ..Default::default()
        };
        let write = store.upsert_shipment(order.id, draft(&order), update).await.unwrap();

        assert!(!write.applied);
        assert_eq!(write.shipment.status, ShipmentStatus::InTransit);
        let stored = store.shipment_for(order.id).await.unwrap();
        assert_eq!(stored.tracking_code.as_deref(), Some("JOB-ORIG"));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let ttl = Duration::from_secs(30);

        assert!(store.try_acquire(id, "a", ttl).await.unwrap());
        assert!(!store.try_acquire(id, "b", ttl).await.unwrap());

        // A stranger's release leaves the lock in place.
        store.release(id, "b").await.unwrap();
        assert!(!store.try_acquire(id, "b", ttl).await.unwrap());

        store.release(id, "a").await.unwrap();
        assert!(store.try_acquire(id, "b", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_taken_over() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();

        assert!(store.try_acquire(id, "a", Duration::ZERO).await.unwrap());
        assert!(store.try_acquire(id, "b", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn test_audit_failures_can_be_injected() {
        let store = InMemoryStore::new();
        store.fail_audit_writes(true);

        let event = AuditEvent::new(
            Uuid::new_v4(),
            courier_shared::models::AuditActor::auto_dispatch(),
            courier_shared::models::AuditAction::DeliveryAutoDispatchPending,
            courier_shared::models::AuditEntity::order(Uuid::new_v4()),
        );
        assert!(store.record(event).await.is_err());
        assert!(store.audit_events().await.is_empty());
    }
}
