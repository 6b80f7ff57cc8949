use async_trait::async_trait;
use courier_core::provider::error_codes;
use courier_core::{
    CancelResult, DeliveryProvider, DeliverySettings, DeliveryStatusHint, DispatchData,
    DispatchResult, EstimateRequest, EstimateResult, ProviderError,
};
use courier_shared::pii::Masked;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Connection settings for the Kwik logistics API.
///
/// Endpoint paths are configuration rather than constants because the
/// external contract is not stable across API versions. `cancel_path` may
/// contain a `{job_id}` placeholder.
#[derive(Debug, Clone, Deserialize)]
pub struct KwikConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "empty_secret")]
    pub api_key: Masked<String>,
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default = "default_dispatch_path")]
    pub dispatch_path: String,
    #[serde(default = "default_cancel_path")]
    pub cancel_path: String,
    #[serde(default = "default_estimate_path")]
    pub estimate_path: String,
}

fn default_base_url() -> String { "https://api.kwik.delivery".to_string() }
fn default_dispatch_path() -> String { "/v1/tasks".to_string() }
fn default_cancel_path() -> String { "/v1/tasks/{job_id}/cancel".to_string() }
fn default_estimate_path() -> String { "/v1/tasks/estimate".to_string() }
fn empty_secret() -> Masked<String> { Masked(String::new()) }

impl KwikConfig {
    pub fn new(api_key: &str, merchant_id: &str) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: Masked(api_key.to_string()),
            merchant_id: merchant_id.to_string(),
            dispatch_path: default_dispatch_path(),
            cancel_path: default_cancel_path(),
            estimate_path: default_estimate_path(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

const JOB_ID_POINTERS: &[&str] = &[
    "/data/job_id",
    "/data/unique_order_id",
    "/data/id",
    "/data/deliveries/0/job_id",
    "/job_id",
    "/id",
];

const TRACKING_URL_POINTERS: &[&str] = &[
    "/data/tracking_url",
    "/data/trackingUrl",
    "/data/tracking_link",
    "/data/result_tracking_link",
    "/data/deliveries/0/result_tracking_link",
    "/tracking_url",
    "/trackingUrl",
];

const PRICE_POINTERS: &[&str] = &[
    "/data/estimated_price",
    "/data/price",
    "/data/amount",
    "/data/per_task_cost",
    "/price",
    "/amount",
];

const ETA_POINTERS: &[&str] = &[
    "/data/eta_minutes",
    "/data/estimated_time",
    "/data/duration",
    "/eta_minutes",
];

/// Third-party logistics provider backed by the Kwik HTTP API.
pub struct KwikProvider {
    config: KwikConfig,
    client: reqwest::Client,
}

impl KwikProvider {
    pub const NAME: &'static str = "Kwik";

    /// Fails fast when credentials are missing; never degrades to a mock.
    pub fn new(config: KwikConfig) -> Result<Self, ProviderError> {
        if config.api_key.0.trim().is_empty() {
            return Err(ProviderError::Configuration("Kwik API key is not set".to_string()));
        }
        if config.merchant_id.trim().is_empty() {
            return Err(ProviderError::Configuration("Kwik merchant id is not set".to_string()));
        }
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Configuration(format!("Invalid Kwik base URL {}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Appends the path template to the base URL one segment at a time, so a
    /// job id is always a single percent-encoded segment.
    fn endpoint(&self, template: &str, job_id: Option<&str>) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| ProviderError::Configuration(format!("Invalid Kwik base URL {}: {}", self.config.base_url, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ProviderError::Configuration(format!("Kwik base URL {} cannot take a path", self.config.base_url)))?;
            segments.pop_if_empty();
            for segment in template.split('/').filter(|segment| !segment.is_empty()) {
                match job_id {
                    Some(id) => segments.push(&segment.replace("{job_id}", id)),
                    None => segments.push(segment),
                };
            }
        }
        Ok(url)
    }

    fn build_dispatch_payload(&self, data: &DispatchData, settings: &DeliverySettings) -> Value {
        json!({
            "merchant_id": self.config.merchant_id,
            "external_reference": data.order_id,
            "order_number": data.order_number,
            "pickup": {
                "name": settings.pickup_name,
                "phone": settings.pickup_phone,
                "address": settings.pickup_address_line1,
                "city": settings.pickup_city,
            },
            "delivery": {
                "name": data.recipient_name,
                "phone": data.recipient_phone,
                "address": data.address_line1,
                "city": data.address_city,
            },
            "parcel": {
                "description": data.parcel_description,
            },
        })
    }

    /// Sends an authenticated POST and returns the status plus raw body.
    /// Only transport faults surface as errors.
    async fn post(&self, url: reqwest::Url, payload: &Value) -> Result<(u16, String), ProviderError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key.0)
            .header("X-Merchant-Id", &self.config.merchant_id)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl DeliveryProvider for KwikProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn dispatch(
        &self,
        data: &DispatchData,
        settings: &DeliverySettings,
    ) -> Result<DispatchResult, ProviderError> {
        let payload = self.build_dispatch_payload(data, settings);
        let url = self.endpoint(&self.config.dispatch_path, None)?;
        let (status, body) = self.post(url, &payload).await?;
        let raw = parse_body(&body);

        if let Some(failed_status) = failure_status(status, &raw) {
            let error = classify_failure(Self::NAME, failed_status, &body);
            warn!("Kwik rejected dispatch for order {}: {}", data.order_id, error);
            return Ok(DispatchResult::failed(Self::NAME, error, Some(raw)));
        }
        if !raw.is_object() {
            return Err(ProviderError::Decode(format!("Kwik dispatch answered {} with a non-JSON body: {}", status, body)));
        }

        let provider_job_id = first_string(&raw, JOB_ID_POINTERS);
        let tracking_url = first_string(&raw, TRACKING_URL_POINTERS);
        match &provider_job_id {
            Some(job_id) => info!("Kwik accepted order {} as job {}", data.order_id, job_id),
            None => warn!("Kwik accepted order {} without a recognizable job id", data.order_id),
        }

        Ok(DispatchResult {
            success: true,
            provider_job_id,
            tracking_url,
            raw_response: Some(raw),
            error: None,
            provider_name: Self::NAME.to_string(),
            status_hint: DeliveryStatusHint::TrackingAvailable,
        })
    }

    async fn cancel(&self, provider_job_id: &str) -> Result<CancelResult, ProviderError> {
        let url = self.endpoint(&self.config.cancel_path, Some(provider_job_id))?;
        let payload = json!({
            "merchant_id": self.config.merchant_id,
            "job_id": provider_job_id,
        });
        let (status, body) = self.post(url, &payload).await?;
        let raw = parse_body(&body);

        if let Some(failed_status) = failure_status(status, &raw) {
            let error = classify_cancel_failure(Self::NAME, failed_status, &body);
            warn!("Kwik refused to cancel job {}: {}", provider_job_id, error);
            return Ok(CancelResult::failed(error, Some(raw)));
        }

        Ok(CancelResult::ok(Some(raw)))
    }

    async fn get_estimate(&self, request: &EstimateRequest) -> Result<EstimateResult, ProviderError> {
        let payload = json!({
            "merchant_id": self.config.merchant_id,
            "pickup": {
                "address": request.origin.address_line1,
                "city": request.origin.city,
            },
            "delivery": {
                "address": request.destination.address_line1,
                "city": request.destination.city,
            },
            "parcel": {
                "description": request.parcel.description,
                "weight_kg": request.parcel.weight_kg,
            },
        });
        let url = self.endpoint(&self.config.estimate_path, None)?;
        let (status, body) = self.post(url, &payload).await?;
        let raw = parse_body(&body);

        if let Some(failed_status) = failure_status(status, &raw) {
            let error = classify_failure(Self::NAME, failed_status, &body);
            return Ok(EstimateResult::failed(Self::NAME, error, Some(raw)));
        }
        if !raw.is_object() {
            return Err(ProviderError::Decode(format!("Kwik estimate answered {} with a non-JSON body: {}", status, body)));
        }

        let Some(price) = first_number(&raw, PRICE_POINTERS) else {
            return Ok(EstimateResult::failed(Self::NAME, "Kwik estimate response did not include a price", Some(raw)));
        };
        let currency = raw
            .pointer("/data/currency")
            .and_then(Value::as_str)
            .unwrap_or("NGN")
            .to_string();

        Ok(EstimateResult {
            success: true,
            amount_minor: Some((price * 100.0).round() as i64),
            currency: Some(currency),
            eta_minutes: first_number(&raw, ETA_POINTERS).map(|m| m.max(0.0).round() as u32),
            error: None,
            raw_response: Some(raw),
            provider_name: Self::NAME.to_string(),
        })
    }
}

/// Keeps non-JSON bodies (HTML error pages, plain text) as a string value.
fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// The API sometimes answers 200 with an error envelope such as
/// `{"status": 402, "message": "..."}` or `{"success": false}`.
fn failure_status(http_status: u16, raw: &Value) -> Option<u16> {
    if !(200..300).contains(&http_status) {
        return Some(http_status);
    }
    if let Some(embedded) = raw.get("status").and_then(Value::as_u64) {
        if !(200..300).contains(&embedded) {
            return Some(embedded as u16);
        }
    }
    if raw.get("success").and_then(Value::as_bool) == Some(false) {
        return Some(http_status);
    }
    None
}

/// Maps a rejected response onto a stable error code where the body allows
/// it, otherwise a descriptive message that keeps the raw body.
pub fn classify_failure(provider: &str, status: u16, body: &str) -> String {
    let lower = body.to_lowercase();
    if lower.contains("insufficient funds") || lower.contains("insufficient balance") || lower.contains("balance") {
        return error_codes::INSUFFICIENT_FUNDS.to_string();
    }
    if lower.contains("invalid address") || lower.contains("address not found") {
        return error_codes::INVALID_ADDRESS.to_string();
    }
    format!("{} API Error: {} - {}", provider, status, body)
}

const ALREADY_DELIVERED_PHRASES: &[&str] = &["already delivered", "already been delivered", "has been delivered"];

pub fn classify_cancel_failure(provider: &str, status: u16, body: &str) -> String {
    let lower = body.to_lowercase();
    if ALREADY_DELIVERED_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return error_codes::ALREADY_DELIVERED.to_string();
    }
    classify_failure(provider, status, body)
}

/// First non-empty string (or number rendered as string) under any pointer.
fn first_string(raw: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| match raw.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_number(raw: &Value, pointers: &[&str]) -> Option<f64> {
    pointers.iter().find_map(|pointer| match raw.pointer(pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
