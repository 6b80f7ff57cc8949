use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use courier_core::{
    NewShipment, ProviderKey, Shipment, ShipmentStatus, ShipmentStore, ShipmentUpdate, ShipmentWrite, StoreError,
};

use crate::backend;

pub struct PgShipmentStore {
    pool: PgPool,
}

impl PgShipmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Update columns fall back to the stored value when the caller passes NULL,
// so an empty update returns the existing row untouched. A status change only
// applies while the stored status is one of $19; otherwise nothing is returned.
const UPSERT_SHIPMENT: &str = r#"
    INSERT INTO shipments (
        id, store_id, order_id, provider, status,
        recipient_name, recipient_phone, address_line1, address_city,
        tracking_code, tracking_url, notes
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (order_id) DO UPDATE SET
        provider = COALESCE($13, shipments.provider),
        status = COALESCE($14, shipments.status),
        tracking_code = COALESCE($15, shipments.tracking_code),
        tracking_url = COALESCE($16, shipments.tracking_url),
        notes = COALESCE($17, shipments.notes),
        updated_at = CASE WHEN $18 THEN shipments.updated_at ELSE NOW() END
    WHERE $14::text IS NULL OR shipments.status = ANY($19)
    RETURNING
        id, store_id, order_id, provider, status,
        recipient_name, recipient_phone, address_line1, address_city,
        tracking_code, tracking_url, notes, created_at, updated_at
"#;

const SELECT_SHIPMENT: &str = r#"
    SELECT
        id, store_id, order_id, provider, status,
        recipient_name, recipient_phone, address_line1, address_city,
        tracking_code, tracking_url, notes, created_at, updated_at
    FROM shipments
    WHERE order_id = $1
"#;

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    store_id: Uuid,
    order_id: Uuid,
    provider: String,
    status: String,
    recipient_name: Option<String>,
    recipient_phone: Option<String>,
    address_line1: Option<String>,
    address_city: Option<String>,
    tracking_code: Option<String>,
    tracking_url: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = StoreError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Shipment {
            id: row.id,
            store_id: row.store_id,
            order_id: row.order_id,
            provider: ProviderKey::from(row.provider.as_str()),
            status: row.status.parse::<ShipmentStatus>().map_err(backend)?,
            recipient_name: row.recipient_name,
            recipient_phone: row.recipient_phone,
            address_line1: row.address_line1,
            address_city: row.address_city,
            tracking_code: row.tracking_code,
            tracking_url: row.tracking_url,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ShipmentStore for PgShipmentStore {
    async fn upsert_shipment(
        &self,
        order_id: Uuid,
        create: NewShipment,
        update: ShipmentUpdate,
    ) -> Result<ShipmentWrite, StoreError> {
        debug!("Upserting shipment for order {}", order_id);

        let allowed_from: Vec<String> = update
            .status
            .map(ShipmentStatus::sources_for)
            .unwrap_or_default()
            .into_iter()
            .map(|status| status.as_str().to_string())
            .collect();

        let row = sqlx::query_as::<_, ShipmentRow>(UPSERT_SHIPMENT)
            .bind(Uuid::new_v4())
            .bind(create.store_id)
            .bind(order_id)
            .bind(create.provider.as_str())
            .bind(create.status.as_str())
            .bind(create.recipient_name)
            .bind(create.recipient_phone)
            .bind(create.address_line1)
            .bind(create.address_city)
            .bind(create.tracking_code)
            .bind(create.tracking_url)
            .bind(create.notes)
            .bind(update.provider.as_ref().map(|p| p.as_str().to_string()))
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.tracking_code.clone())
            .bind(update.tracking_url.clone())
            .bind(update.notes.clone())
            .bind(update.is_empty())
            .bind(allowed_from)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        if let Some(row) = row {
            return Ok(ShipmentWrite { shipment: Shipment::try_from(row)?, applied: true });
        }

        // The guard refused the update; report the row as it stands.
        let row = sqlx::query_as::<_, ShipmentRow>(SELECT_SHIPMENT)
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        debug!("Shipment for order {} is {}, update not applied", order_id, row.status);
        Ok(ShipmentWrite { shipment: Shipment::try_from(row)?, applied: false })
    }
}
