use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{DeliverySettings, ProviderKey};

/// Stable failure codes callers can branch on without reading provider text.
pub mod error_codes {
    pub const INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";
    pub const INVALID_ADDRESS: &str = "INVALID_ADDRESS";
    pub const ALREADY_DELIVERED: &str = "ALREADY_DELIVERED";
}

/// Faults that are not business rejections. A courier saying "no" is a
/// `success: false` result, not one of these.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider configuration error: {0}")]
    Configuration(String),
    #[error("Provider transport error: {0}")]
    Transport(String),
    #[error("Provider response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatusHint {
    /// Handoff recorded locally, no external tracking.
    ManualConfirmed,
    /// The courier returned a job we can track.
    TrackingAvailable,
    Failed,
}

/// Provider-facing payload built from best-available order data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchData {
    pub order_id: Uuid,
    pub order_number: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub address_line1: String,
    pub address_city: String,
    pub parcel_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    pub provider_job_id: Option<String>,
    pub tracking_url: Option<String>,
    pub raw_response: Option<serde_json::Value>,
    pub error: Option<String>,
    pub provider_name: String,
    pub status_hint: DeliveryStatusHint,
}

impl DispatchResult {
    pub fn failed(provider_name: &str, error: impl Into<String>, raw_response: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            provider_job_id: None,
            tracking_url: None,
            raw_response,
            error: Some(error.into()),
            provider_name: provider_name.to_string(),
            status_hint: DeliveryStatusHint::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub success: bool,
    pub error: Option<String>,
    pub raw_response: Option<serde_json::Value>,
}

impl CancelResult {
    pub fn ok(raw_response: Option<serde_json::Value>) -> Self {
        Self { success: true, error: None, raw_response }
    }

    pub fn failed(error: impl Into<String>, raw_response: Option<serde_json::Value>) -> Self {
        Self { success: false, error: Some(error.into()), raw_response }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address_line1: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub description: String,
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub origin: Location,
    pub destination: Location,
    pub parcel: Parcel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResult {
    pub success: bool,
    /// Quoted price in minor currency units.
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub eta_minutes: Option<u32>,
    pub error: Option<String>,
    pub raw_response: Option<serde_json::Value>,
    pub provider_name: String,
}

impl EstimateResult {
    pub fn failed(provider_name: &str, error: impl Into<String>, raw_response: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            amount_minor: None,
            currency: None,
            eta_minutes: None,
            error: Some(error.into()),
            raw_response,
            provider_name: provider_name.to_string(),
        }
    }
}

#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Submit a delivery job with the courier.
    async fn dispatch(
        &self,
        data: &DispatchData,
        settings: &DeliverySettings,
    ) -> Result<DispatchResult, ProviderError>;

    /// Best-effort cancellation of a previously accepted job.
    async fn cancel(&self, provider_job_id: &str) -> Result<CancelResult, ProviderError>;

    /// Price/duration quote, used outside the dispatch path.
    async fn get_estimate(&self, request: &EstimateRequest) -> Result<EstimateResult, ProviderError>;
}

/// Maps a store's configured provider key to a live provider.
pub trait ProviderResolver: Send + Sync {
    /// Whether the platform holds the credentials this courier needs.
    fn is_configured(&self, key: &ProviderKey) -> bool;

    /// Never fails: unknown or unconfigured keys resolve to the manual provider.
    fn resolve(&self, key: &ProviderKey) -> Arc<dyn DeliveryProvider>;
}
