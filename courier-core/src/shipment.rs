use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::ProviderKey;
use crate::CoreError;

/// Shipment lifecycle.
///
/// `DRAFT` is written by the dispatcher while a shipment waits for staff
/// confirmation; `REQUESTED` once a courier has accepted the job. Everything
/// after that is driven by courier status callbacks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Draft,
    Requested,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
    Canceled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 8] = [
        ShipmentStatus::Draft,
        ShipmentStatus::Requested,
        ShipmentStatus::Accepted,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
        ShipmentStatus::Failed,
        ShipmentStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Draft => "DRAFT",
            ShipmentStatus::Requested => "REQUESTED",
            ShipmentStatus::Accepted => "ACCEPTED",
            ShipmentStatus::PickedUp => "PICKED_UP",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Failed => "FAILED",
            ShipmentStatus::Canceled => "CANCELED",
        }
    }

    /// Position on the forward path. Failed and Canceled sit off the path.
    fn rank(&self) -> Option<u8> {
        match self {
            ShipmentStatus::Draft => Some(0),
            ShipmentStatus::Requested => Some(1),
            ShipmentStatus::Accepted => Some(2),
            ShipmentStatus::PickedUp => Some(3),
            ShipmentStatus::InTransit => Some(4),
            ShipmentStatus::Delivered => Some(5),
            ShipmentStatus::Failed | ShipmentStatus::Canceled => None,
        }
    }

    /// A courier already holds (or has completed) the job.
    pub fn is_dispatched(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Requested
                | ShipmentStatus::Accepted
                | ShipmentStatus::PickedUp
                | ShipmentStatus::InTransit
                | ShipmentStatus::Delivered
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Canceled)
    }

    /// Forward-only progression; cancellation is allowed from any
    /// non-terminal state and a failed job may be requested again.
    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            ShipmentStatus::Canceled => true,
            ShipmentStatus::Failed => *self != ShipmentStatus::Draft,
            _ => match (self, self.rank(), next.rank()) {
                (ShipmentStatus::Failed, _, _) => next == ShipmentStatus::Requested,
                (_, Some(from), Some(to)) => to >= from,
                _ => false,
            },
        }
    }

    /// Statuses a stored row may hold for a write to move it to `next`.
    /// Writing the status a row already has does not count as a move.
    pub fn sources_for(next: ShipmentStatus) -> Vec<ShipmentStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| *from != next && from.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ShipmentStatus::Draft),
            "REQUESTED" => Ok(ShipmentStatus::Requested),
            "ACCEPTED" => Ok(ShipmentStatus::Accepted),
            "PICKED_UP" => Ok(ShipmentStatus::PickedUp),
            "IN_TRANSIT" => Ok(ShipmentStatus::InTransit),
            "DELIVERED" => Ok(ShipmentStatus::Delivered),
            "FAILED" => Ok(ShipmentStatus::Failed),
            "CANCELED" | "CANCELLED" => Ok(ShipmentStatus::Canceled),
            other => Err(CoreError::ValidationError(format!("Unknown shipment status: {}", other))),
        }
    }
}

/// The physical fulfillment attempt for exactly one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_id: Uuid,
    pub provider: ProviderKey,
    pub status: ShipmentStatus,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_city: Option<String>,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    /// Raw provider response, kept for diagnostics.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Apply a status change, refusing regressions.
    pub fn transition_to(&mut self, next: ShipmentStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Fields written when no shipment exists yet for the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShipment {
    pub store_id: Uuid,
    pub order_id: Uuid,
    pub provider: ProviderKey,
    pub status: ShipmentStatus,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_city: Option<String>,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    pub notes: Option<String>,
}

impl NewShipment {
    pub fn into_shipment(self) -> Shipment {
        let now = Utc::now();
        Shipment {
            id: Uuid::new_v4(),
            store_id: self.store_id,
            order_id: self.order_id,
            provider: self.provider,
            status: self.status,
            recipient_name: self.recipient_name,
            recipient_phone: self.recipient_phone,
            address_line1: self.address_line1,
            address_city: self.address_city,
            tracking_code: self.tracking_code,
            tracking_url: self.tracking_url,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields overwritten when the shipment already exists. `None` leaves the
/// stored value alone, so an empty update only ensures the row exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentUpdate {
    pub provider: Option<ProviderKey>,
    pub status: Option<ShipmentStatus>,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    pub notes: Option<String>,
}

impl ShipmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.provider.is_none()
            && self.status.is_none()
            && self.tracking_code.is_none()
            && self.tracking_url.is_none()
            && self.notes.is_none()
    }

    /// Whether this update may be applied to a row currently in `current`.
    /// Updates without a status change always apply.
    pub fn allowed_from(&self, current: ShipmentStatus) -> bool {
        match self.status {
            Some(next) => current != next && current.can_transition_to(next),
            None => true,
        }
    }

    /// Applies the update unless its status change would be refused.
    /// Returns `false`, leaving the shipment untouched, when refused.
    pub fn apply(&self, shipment: &mut Shipment) -> bool {
        if !self.allowed_from(shipment.status) {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        if let Some(provider) = &self.provider {
            shipment.provider = provider.clone();
        }
        if let Some(status) = self.status {
            shipment.status = status;
        }
        if let Some(code) = &self.tracking_code {
            shipment.tracking_code = Some(code.clone());
        }
        if let Some(url) = &self.tracking_url {
            shipment.tracking_url = Some(url.clone());
        }
        if let Some(notes) = &self.notes {
            shipment.notes = Some(notes.clone());
        }
        shipment.updated_at = Utc::now();
        true
    }
}

/// Outcome of a create-or-update. `applied` is `false` when the row already
/// existed and its status refused the update; `shipment` is then the row as
/// stored.
#[derive(Debug, Clone)]
pub struct ShipmentWrite {
    pub shipment: Shipment,
    pub applied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Shipment {
        NewShipment {
            store_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            provider: ProviderKey::Manual,
            status: ShipmentStatus::Draft,
            recipient_name: Some("Ada Obi".to_string()),
            recipient_phone: Some("08012345678".to_string()),
            address_line1: Some("5 Bode Thomas St".to_string()),
            address_city: Some("Lagos".to_string()),
            tracking_code: None,
            tracking_url: None,
            notes: None,
        }
        .into_shipment()
    }

    #[test]
    fn test_dispatched_statuses() {
        assert!(!ShipmentStatus::Draft.is_dispatched());
        assert!(ShipmentStatus::Requested.is_dispatched());
        assert!(ShipmentStatus::Delivered.is_dispatched());
        assert!(!ShipmentStatus::Failed.is_dispatched());
        assert!(!ShipmentStatus::Canceled.is_dispatched());
    }

    #[test]
    fn test_shipment_lifecycle() {
        let mut shipment = draft();

        shipment.transition_to(ShipmentStatus::Requested).unwrap();
        shipment.transition_to(ShipmentStatus::Accepted).unwrap();
        shipment.transition_to(ShipmentStatus::PickedUp).unwrap();
        shipment.transition_to(ShipmentStatus::InTransit).unwrap();
        shipment.transition_to(ShipmentStatus::Delivered).unwrap();

        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert!(shipment.transition_to(ShipmentStatus::Canceled).is_err());
    }

    #[test]
    fn test_no_regression() {
        let mut shipment = draft();
        shipment.transition_to(ShipmentStatus::InTransit).unwrap();

        let result = shipment.transition_to(ShipmentStatus::Requested);
        assert!(result.is_err());
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
    }

    #[test]
    fn test_failed_job_can_be_requested_again() {
        assert!(ShipmentStatus::Failed.can_transition_to(ShipmentStatus::Requested));
        assert!(!ShipmentStatus::Failed.can_transition_to(ShipmentStatus::Delivered));
        assert!(ShipmentStatus::Draft.can_transition_to(ShipmentStatus::Canceled));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("PICKED_UP".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::PickedUp);
        assert_eq!("CANCELLED".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::Canceled);
        assert!("LOST".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn test_empty_update_keeps_existing_fields() {
        let mut shipment = draft();
        let before = shipment.updated_at;
        assert!(ShipmentUpdate::default().apply(&mut shipment));
        assert_eq!(shipment.status, ShipmentStatus::Draft);
        assert_eq!(shipment.updated_at, before);
    }

    #[test]
    fn test_update_refuses_to_move_status_backwards() {
        let mut shipment = draft();
        shipment.transition_to(ShipmentStatus::InTransit).unwrap();
        shipment.tracking_code = Some("JOB-ORIG".to_string());

        let update = ShipmentUpdate {
            status: Some(ShipmentStatus::Requested),
            tracking_code: Some("JOB-NEW".to_string()),
            ..Default::default()
        };

        assert!(!update.apply(&mut shipment));
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
        assert_eq!(shipment.tracking_code.as_deref(), Some("JOB-ORIG"));
    }

    #[test]
    fn test_requested_is_not_written_twice() {
        let update = ShipmentUpdate { status: Some(ShipmentStatus::Requested), ..Default::default() };
        assert!(update.allowed_from(ShipmentStatus::Draft));
        assert!(update.allowed_from(ShipmentStatus::Failed));
        assert!(!update.allowed_from(ShipmentStatus::Requested));
        assert!(!update.allowed_from(ShipmentStatus::Canceled));
    }

    #[test]
    fn test_sources_for_requested_and_canceled() {
        assert_eq!(
            ShipmentStatus::sources_for(ShipmentStatus::Requested),
            vec![ShipmentStatus::Draft, ShipmentStatus::Failed]
        );
        let cancelable = ShipmentStatus::sources_for(ShipmentStatus::Canceled);
        assert!(cancelable.contains(&ShipmentStatus::InTransit));
        assert!(!cancelable.contains(&ShipmentStatus::Delivered));
        assert!(!cancelable.contains(&ShipmentStatus::Canceled));
    }
}
