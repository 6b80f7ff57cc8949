use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_core::{
    AuditLog, Channel, DeliverySettings, DispatchData, DispatchLock, DispatchMode, EstimateRequest,
    EstimateResult, NewShipment, Order, OrderStore, ProviderKey, ProviderResolver,
    ShipmentStatus, ShipmentStore, ShipmentUpdate,
};
use courier_shared::models::{AuditAction, AuditActor, AuditEntity, AuditEvent, ShipmentRequestedEvent};
use courier_shared::pii::Masked;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{CancelOutcome, DispatchAttempt};
use crate::readiness::check_readiness;
use crate::resolve;

pub const REASON_NOT_FOUND: &str = "Order or Settings not found";
pub const REASON_ALREADY_DISPATCHED: &str = "Already Dispatched";
pub const REASON_IN_PROGRESS: &str = "Dispatch Already In Progress";

const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);

/// Decides, for one order and one triggering channel, whether to contact a
/// courier now, defer to staff, or skip. Safe to call repeatedly for the
/// same order: an already-dispatched shipment short-circuits the run.
pub struct DispatchService {
    orders: Arc<dyn OrderStore>,
    shipments: Arc<dyn ShipmentStore>,
    audit: Arc<dyn AuditLog>,
    providers: Arc<dyn ProviderResolver>,
    lock: Option<Arc<dyn DispatchLock>>,
    lock_ttl: Duration,
}

impl DispatchService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        shipments: Arc<dyn ShipmentStore>,
        audit: Arc<dyn AuditLog>,
        providers: Arc<dyn ProviderResolver>,
    ) -> Self {
        Self {
            orders,
            shipments,
            audit,
            providers,
            lock: None,
            lock_ttl: DEFAULT_LOCK_TTL,
        }
    }

    /// Serialize runs per order so concurrent triggers cannot both reach the
    /// courier. Without a lock only the shipment-status gate dedupes.
    pub fn with_lock(mut self, lock: Arc<dyn DispatchLock>, ttl: Duration) -> Self {
        self.lock = Some(lock);
        self.lock_ttl = ttl;
        self
    }

    /// Single entry point for order-confirmed triggers. Never fails: every
    /// path ends in one of the four dispatch outcomes.
    pub async fn auto_dispatch(&self, order_id: Uuid, channel: Channel, idempotency_key: &str) -> DispatchAttempt {
        info!("Auto-dispatch for order {} via {} (key: {})", order_id, channel, idempotency_key);

        let Some(lock) = &self.lock else {
            return self.run(order_id, channel).await;
        };

        let token = if idempotency_key.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            idempotency_key.to_string()
        };

        match lock.try_acquire(order_id, &token, self.lock_ttl).await {
            Ok(true) => {
                let attempt = self.run(order_id, channel).await;
                if let Err(e) = lock.release(order_id, &token).await {
                    warn!("Failed to release dispatch lock for order {}: {}", order_id, e);
                }
                attempt
            }
            Ok(false) => {
                info!("Order {} is already being dispatched, skipping", order_id);
                DispatchAttempt::skipped(REASON_IN_PROGRESS)
            }
            Err(e) => {
                // Fail open: the lock narrows the race, the shipment gate still applies.
                warn!("Dispatch lock unavailable for order {}: {}", order_id, e);
                self.run(order_id, channel).await
            }
        }
    }

    async fn run(&self, order_id: Uuid, channel: Channel) -> DispatchAttempt {
        // 1. Context
        let order = match self.orders.load_order_with_context(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                info!("Order {} not found", order_id);
                return DispatchAttempt::skipped(REASON_NOT_FOUND);
            }
            Err(e) => {
                error!("Failed to load order {}: {}", order_id, e);
                return DispatchAttempt::blocked(format!("Failed to load order: {}", e));
            }
        };
        let Some(settings) = order.delivery_settings.clone() else {
            info!("Store {} has no delivery settings", order.store_id);
            return DispatchAttempt::skipped(REASON_NOT_FOUND);
        };

        // 2-3. Policy gates
        if !settings.auto_dispatch_enabled {
            info!("Disabled globally for store {}", order.store_id);
            return DispatchAttempt::skipped("Auto-Dispatch Disabled globally");
        }
        if !settings.auto_dispatch_allowed_for(channel) {
            info!("Disabled for {} on store {}", channel, order.store_id);
            return DispatchAttempt::skipped(format!("Auto-Dispatch Disabled for {}", channel_label(channel)));
        }

        // 4. Idempotency gate
        if let Some(existing) = &order.shipment {
            if existing.status.is_dispatched() {
                info!("Order {} already dispatched ({})", order.id, existing.status);
                return DispatchAttempt::skipped(REASON_ALREADY_DISPATCHED).with_shipment(existing.clone());
            }
        }

        // 5. Readiness
        let readiness = check_readiness(&order, &settings, self.providers.as_ref());
        if !readiness.is_ready() {
            info!("Order {} not ready: {:?}", order.id, readiness.blockers);
            return DispatchAttempt::blocked(format!("Readiness Failed: {}", readiness.blockers.join(", ")));
        }

        // Terminal shipments are neither re-drafted nor re-dispatched.
        if let Some(existing) = &order.shipment {
            if !existing.status.can_transition_to(ShipmentStatus::Requested) {
                info!("Order {} has a {} shipment, not dispatching", order.id, existing.status);
                return DispatchAttempt::blocked(format!("Shipment is {} and cannot be dispatched", existing.status));
            }
        }

        // 6-7. Mode
        match settings.auto_dispatch_mode {
            DispatchMode::Confirm => self.ensure_draft(&order, &settings, channel).await,
            DispatchMode::Auto => self.dispatch_now(&order, &settings, channel).await,
        }
    }

    /// CONFIRM mode: make sure a draft exists for staff to review. Never
    /// contacts a courier and never overwrites an existing shipment.
    async fn ensure_draft(&self, order: &Order, settings: &DeliverySettings, channel: Channel) -> DispatchAttempt {
        let create = NewShipment {
            store_id: order.store_id,
            order_id: order.id,
            provider: settings.provider.clone(),
            status: ShipmentStatus::Draft,
            recipient_name: Some(resolve::recipient_name(order).value),
            recipient_phone: resolve::recipient_phone(order).map(|r| r.value),
            address_line1: resolve::address_line1(order).map(|r| r.value),
            address_city: resolve::address_city(order).map(|r| r.value),
            tracking_code: None,
            tracking_url: None,
            notes: None,
        };

        let shipment = match self.shipments.upsert_shipment(order.id, create, ShipmentUpdate::default()).await {
            Ok(write) => write.shipment,
            Err(e) => {
                error!("Failed to record draft shipment for order {}: {}", order.id, e);
                return DispatchAttempt::blocked(format!("Failed to record draft shipment: {}", e));
            }
        };

        let event = AuditEvent::new(
            order.store_id,
            AuditActor::auto_dispatch(),
            AuditAction::DeliveryAutoDispatchPending,
            AuditEntity::order(order.id),
        )
        .with_after(json!({ "mode": DispatchMode::Confirm.as_str(), "channel": channel }));
        self.record_audit(event).await;

        info!("Order {} awaiting confirmation (shipment {})", order.id, shipment.id);
        DispatchAttempt::pending_confirmation(shipment)
    }

    /// AUTO mode: hand the job to the store's courier and record the result.
    async fn dispatch_now(&self, order: &Order, settings: &DeliverySettings, channel: Channel) -> DispatchAttempt {
        let provider = self.providers.resolve(&settings.provider);
        let data = build_dispatch_data(order);

        // Re-checked right before the call; the snapshot may have changed since readiness.
        if data.address_line1.is_empty() || data.recipient_phone.is_empty() {
            return DispatchAttempt::blocked("Address/Phone missing at dispatch time");
        }

        info!(
            "Dispatching order {} via {} to {}",
            order.id,
            provider.name(),
            Masked(data.recipient_phone.as_str())
        );

        let result = match provider.dispatch(&data, settings).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} dispatch failed for order {}: {}", provider.name(), order.id, e);
                return DispatchAttempt::blocked(e.to_string());
            }
        };

        if !result.success {
            let error = result.error.unwrap_or_else(|| "Unknown provider error".to_string());
            warn!("{} rejected order {}: {}", result.provider_name, order.id, error);
            return DispatchAttempt::blocked(format!("Provider Error: {}", error));
        }

        if result.provider_job_id.is_none() {
            warn!("{} accepted order {} without a job id", result.provider_name, order.id);
        }

        let notes = result.raw_response.as_ref().map(|raw| raw.to_string());
        let create = NewShipment {
            store_id: order.store_id,
            order_id: order.id,
            provider: settings.provider.clone(),
            status: ShipmentStatus::Requested,
            recipient_name: Some(data.recipient_name.clone()),
            recipient_phone: Some(data.recipient_phone.clone()),
            address_line1: Some(data.address_line1.clone()),
            address_city: Some(data.address_city.clone()).filter(|city| !city.is_empty()),
            tracking_code: result.provider_job_id.clone(),
            tracking_url: result.tracking_url.clone(),
            notes: notes.clone(),
        };
        let update = ShipmentUpdate {
            provider: Some(settings.provider.clone()),
            status: Some(ShipmentStatus::Requested),
            tracking_code: result.provider_job_id.clone(),
            tracking_url: result.tracking_url.clone(),
            notes,
        };

        let shipment = match self.shipments.upsert_shipment(order.id, create, update).await {
            Ok(write) if write.applied => write.shipment,
            Ok(write) => {
                // Another run or a courier callback moved the shipment on while we were dispatching.
                warn!(
                    "{} accepted order {} (job {:?}) but the shipment is already {}",
                    result.provider_name, order.id, result.provider_job_id, write.shipment.status
                );
                return DispatchAttempt::skipped(REASON_ALREADY_DISPATCHED).with_shipment(write.shipment);
            }
            Err(e) => {
                error!(
                    "{} accepted order {} (job {:?}) but the shipment write failed: {}",
                    result.provider_name, order.id, result.provider_job_id, e
                );
                return DispatchAttempt::blocked(format!("Failed to record shipment: {}", e));
            }
        };

        let requested = ShipmentRequestedEvent {
            shipment_id: shipment.id,
            order_id: order.id,
            store_id: order.store_id,
            provider: settings.provider.to_string(),
            channel: channel.to_string(),
            tracking_code: shipment.tracking_code.clone(),
            tracking_url: shipment.tracking_url.clone(),
            timestamp: Utc::now().timestamp(),
        };
        let event = AuditEvent::new(
            order.store_id,
            AuditActor::auto_dispatch(),
            AuditAction::DeliveryAutoDispatchAttempted,
            AuditEntity::shipment(shipment.id),
        )
        .with_after(json!({
            "channel": channel,
            "status": ShipmentStatus::Requested,
            "mode": settings.auto_dispatch_mode,
            "trackingUrl": shipment.tracking_url,
            "event": requested,
        }));
        self.record_audit(event).await;

        info!("Order {} dispatched as shipment {}", order.id, shipment.id);
        DispatchAttempt::dispatched(shipment)
    }

    /// Cancels the order's shipment with its courier, then locally.
    pub async fn cancel_dispatch(&self, order_id: Uuid) -> CancelOutcome {
        let order = match self.orders.load_order_with_context(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return CancelOutcome::not_found("Order not found"),
            Err(e) => {
                error!("Failed to load order {}: {}", order_id, e);
                return CancelOutcome::rejected(format!("Failed to load order: {}", e), None);
            }
        };
        let Some(shipment) = order.shipment.clone() else {
            return CancelOutcome::not_found("No shipment for order");
        };

        if !shipment.status.can_transition_to(ShipmentStatus::Canceled) {
            return CancelOutcome::rejected(format!("Shipment is already {}", shipment.status), Some(shipment));
        }

        // Drafts never reached a courier and are canceled locally.
        let job_id = shipment
            .tracking_code
            .as_deref()
            .filter(|code| shipment.status.is_dispatched() && !code.trim().is_empty());
        if let Some(job_id) = job_id {
            let provider = self.providers.resolve(&shipment.provider);
            match provider.cancel(job_id).await {
                Ok(result) if result.success => {}
                Ok(result) => {
                    let error = result.error.unwrap_or_else(|| "Unknown provider error".to_string());
                    warn!("{} refused to cancel job {}: {}", provider.name(), job_id, error);
                    return CancelOutcome::rejected(format!("Provider Error: {}", error), Some(shipment));
                }
                Err(e) => {
                    warn!("{} cancel failed for job {}: {}", provider.name(), job_id, e);
                    return CancelOutcome::rejected(e.to_string(), Some(shipment));
                }
            }
        }

        let previous = shipment.status;
        let create = NewShipment {
            store_id: shipment.store_id,
            order_id: shipment.order_id,
            provider: shipment.provider.clone(),
            status: ShipmentStatus::Canceled,
            recipient_name: shipment.recipient_name.clone(),
            recipient_phone: shipment.recipient_phone.clone(),
            address_line1: shipment.address_line1.clone(),
            address_city: shipment.address_city.clone(),
            tracking_code: shipment.tracking_code.clone(),
            tracking_url: shipment.tracking_url.clone(),
            notes: shipment.notes.clone(),
        };
        let update = ShipmentUpdate {
            status: Some(ShipmentStatus::Canceled),
            ..ShipmentUpdate::default()
        };

        let canceled = match self.shipments.upsert_shipment(order.id, create, update).await {
            Ok(write) if write.applied => write.shipment,
            Ok(write) => {
                let status = write.shipment.status;
                warn!("Shipment for order {} moved to {} before it could be canceled", order.id, status);
                return CancelOutcome::rejected(format!("Shipment is already {}", status), Some(write.shipment));
            }
            Err(e) => {
                error!("Courier canceled order {} but the shipment write failed: {}", order.id, e);
                return CancelOutcome::rejected(format!("Failed to record cancellation: {}", e), Some(shipment));
            }
        };

        let event = AuditEvent::new(
            order.store_id,
            AuditActor::auto_dispatch(),
            AuditAction::DeliveryShipmentCanceled,
            AuditEntity::shipment(canceled.id),
        )
        .with_before(json!({ "status": previous }))
        .with_after(json!({ "status": ShipmentStatus::Canceled }));
        self.record_audit(event).await;

        info!("Shipment {} for order {} canceled", canceled.id, order.id);
        CancelOutcome::canceled(canceled)
    }

    /// Quote from the given courier. Transport faults come back as a failed estimate.
    pub async fn estimate(&self, provider_key: &ProviderKey, request: &EstimateRequest) -> EstimateResult {
        let provider = self.providers.resolve(provider_key);
        match provider.get_estimate(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} estimate failed: {}", provider.name(), e);
                EstimateResult::failed(provider.name(), e.to_string(), None)
            }
        }
    }

    async fn record_audit(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(e) = self.audit.record(event).await {
            warn!("Audit log failed ({}): {}", action.as_str(), e);
        }
    }
}

fn channel_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Storefront => "Storefront",
        Channel::Messaging => "Messaging",
    }
}

/// Provider payload from the same best-available resolution readiness uses.
fn build_dispatch_data(order: &Order) -> DispatchData {
    DispatchData {
        order_id: order.id,
        order_number: order.order_number.clone(),
        recipient_name: resolve::recipient_name(order).value,
        recipient_phone: resolve::recipient_phone(order).map(|r| r.value).unwrap_or_default(),
        address_line1: resolve::address_line1(order).map(|r| r.value).unwrap_or_default(),
        address_city: resolve::address_city(order).map(|r| r.value).unwrap_or_default(),
        parcel_description: format!("Order #{}", order.order_number),
    }
}
