use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use courier_core::{
    Customer, DeliverySettings, DispatchMode, Order, OrderStore, ProviderKey, Shipment,
    ShipmentStatus, StoreError,
};

use crate::backend;

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LOAD_ORDER_WITH_CONTEXT: &str = r#"
    SELECT
        o.id, o.store_id, o.order_number, o.customer_phone,
        c.id AS customer_id, c.first_name, c.last_name, c.phone AS customer_contact_phone,
        s.id AS shipment_id, s.provider AS shipment_provider, s.status AS shipment_status,
        s.recipient_name, s.recipient_phone, s.address_line1, s.address_city,
        s.tracking_code, s.tracking_url, s.notes,
        s.created_at AS shipment_created_at, s.updated_at AS shipment_updated_at,
        d.store_id AS settings_store_id, d.is_enabled, d.pickup_name, d.pickup_phone,
        d.pickup_address_line1, d.pickup_city, d.provider AS settings_provider,
        d.auto_dispatch_enabled, d.auto_dispatch_storefront, d.auto_dispatch_messaging,
        d.auto_dispatch_mode
    FROM orders o
    LEFT JOIN customers c ON c.id = o.customer_id
    LEFT JOIN shipments s ON s.order_id = o.id
    LEFT JOIN store_delivery_settings d ON d.store_id = o.store_id
    WHERE o.id = $1
"#;

// Every joined column is nullable; the LEFT JOINs decide which groups exist.
#[derive(sqlx::FromRow)]
struct OrderContextRow {
    id: Uuid,
    store_id: Uuid,
    order_number: String,
    customer_phone: Option<String>,

    customer_id: Option<Uuid>,
    first_name: Option<String>,
    last_name: Option<String>,
    customer_contact_phone: Option<String>,

    shipment_id: Option<Uuid>,
    shipment_provider: Option<String>,
    shipment_status: Option<String>,
    recipient_name: Option<String>,
    recipient_phone: Option<String>,
    address_line1: Option<String>,
    address_city: Option<String>,
    tracking_code: Option<String>,
    tracking_url: Option<String>,
    notes: Option<String>,
    shipment_created_at: Option<DateTime<Utc>>,
    shipment_updated_at: Option<DateTime<Utc>>,

    settings_store_id: Option<Uuid>,
    is_enabled: Option<bool>,
    pickup_name: Option<String>,
    pickup_phone: Option<String>,
    pickup_address_line1: Option<String>,
    pickup_city: Option<String>,
    settings_provider: Option<String>,
    auto_dispatch_enabled: Option<bool>,
    auto_dispatch_storefront: Option<bool>,
    auto_dispatch_messaging: Option<bool>,
    auto_dispatch_mode: Option<String>,
}

impl OrderContextRow {
    fn into_order(self) -> Result<Order, StoreError> {
        let customer = self.customer_id.map(|id| Customer {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.customer_contact_phone,
        });

        let shipment = match self.shipment_id {
            Some(id) => {
                let status = self
                    .shipment_status
                    .as_deref()
                    .unwrap_or("DRAFT")
                    .parse::<ShipmentStatus>()
                    .map_err(backend)?;
                let now = Utc::now();
                Some(Shipment {
                    id,
                    store_id: self.store_id,
                    order_id: self.id,
                    provider: ProviderKey::from(self.shipment_provider.as_deref().unwrap_or_default()),
                    status,
                    recipient_name: self.recipient_name,
                    recipient_phone: self.recipient_phone,
                    address_line1: self.address_line1,
                    address_city: self.address_city,
                    tracking_code: self.tracking_code,
                    tracking_url: self.tracking_url,
                    notes: self.notes,
                    created_at: self.shipment_created_at.unwrap_or(now),
                    updated_at: self.shipment_updated_at.unwrap_or(now),
                })
            }
            None => None,
        };

        let delivery_settings = match self.settings_store_id {
            Some(store_id) => {
                let mode = self
                    .auto_dispatch_mode
                    .as_deref()
                    .unwrap_or("CONFIRM")
                    .parse::<DispatchMode>()
                    .map_err(backend)?;
                Some(DeliverySettings {
                    store_id,
                    is_enabled: self.is_enabled.unwrap_or(false),
                    pickup_name: self.pickup_name,
                    pickup_phone: self.pickup_phone,
                    pickup_address_line1: self.pickup_address_line1,
                    pickup_city: self.pickup_city,
                    provider: ProviderKey::from(self.settings_provider.as_deref().unwrap_or_default()),
                    auto_dispatch_enabled: self.auto_dispatch_enabled.unwrap_or(false),
                    auto_dispatch_storefront: self.auto_dispatch_storefront.unwrap_or(false),
                    auto_dispatch_messaging: self.auto_dispatch_messaging.unwrap_or(false),
                    auto_dispatch_mode: mode,
                })
            }
            None => None,
        };

        Ok(Order {
            id: self.id,
            store_id: self.store_id,
            order_number: self.order_number,
            customer_phone: self.customer_phone,
            shipment,
            customer,
            delivery_settings,
        })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn load_order_with_context(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderContextRow>(LOAD_ORDER_WITH_CONTEXT)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(OrderContextRow::into_order).transpose()
    }
}
