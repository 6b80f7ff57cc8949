use courier_core::Shipment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchOutcome {
    /// A courier accepted the job.
    Dispatched,
    /// A draft shipment waits for staff confirmation.
    PendingConfirmation,
    /// Dispatch was attempted but readiness or the courier said no.
    Blocked,
    /// A policy gate closed before anything was attempted.
    Skipped,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Dispatched => "DISPATCHED",
            DispatchOutcome::PendingConfirmation => "PENDING_CONFIRMATION",
            DispatchOutcome::Blocked => "BLOCKED",
            DispatchOutcome::Skipped => "SKIPPED",
        }
    }
}

/// Result of one orchestration run. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchAttempt {
    pub status: DispatchOutcome,
    pub reason: Option<String>,
    pub shipment: Option<Shipment>,
}

impl DispatchAttempt {
    pub fn dispatched(shipment: Shipment) -> Self {
        Self { status: DispatchOutcome::Dispatched, reason: None, shipment: Some(shipment) }
    }

    pub fn pending_confirmation(shipment: Shipment) -> Self {
        Self {
            status: DispatchOutcome::PendingConfirmation,
            reason: Some("Awaiting Admin Confirmation".to_string()),
            shipment: Some(shipment),
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self { status: DispatchOutcome::Blocked, reason: Some(reason.into()), shipment: None }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self { status: DispatchOutcome::Skipped, reason: Some(reason.into()), shipment: None }
    }

    pub fn with_shipment(mut self, shipment: Shipment) -> Self {
        self.shipment = Some(shipment);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelStatus {
    Canceled,
    Rejected,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub status: CancelStatus,
    pub reason: Option<String>,
    pub shipment: Option<Shipment>,
}

impl CancelOutcome {
    pub fn canceled(shipment: Shipment) -> Self {
        Self { status: CancelStatus::Canceled, reason: None, shipment: Some(shipment) }
    }

    pub fn rejected(reason: impl Into<String>, shipment: Option<Shipment>) -> Self {
        Self { status: CancelStatus::Rejected, reason: Some(reason.into()), shipment }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self { status: CancelStatus::NotFound, reason: Some(reason.into()), shipment: None }
    }
}
