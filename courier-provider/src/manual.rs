use async_trait::async_trait;
use chrono::Utc;
use courier_core::{
    CancelResult, DeliveryProvider, DeliverySettings, DeliveryStatusHint, DispatchData,
    DispatchResult, EstimateRequest, EstimateResult, ProviderError,
};

/// Records the handoff locally for stores without a logistics integration.
/// Every call succeeds.
#[derive(Debug, Default, Clone)]
pub struct ManualProvider;

impl ManualProvider {
    pub const NAME: &'static str = "Manual";

    pub fn new() -> Self {
        Self
    }

    /// Format: MANUAL-{millis}-{short_order_id}
    fn generate_job_id(data: &DispatchData) -> String {
        let timestamp = Utc::now().timestamp_millis();
        let short_id = &data.order_id.simple().to_string()[..8];
        format!("MANUAL-{}-{}", timestamp, short_id.to_uppercase())
    }
}

#[async_trait]
impl DeliveryProvider for ManualProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn dispatch(
        &self,
        data: &DispatchData,
        _settings: &DeliverySettings,
    ) -> Result<DispatchResult, ProviderError> {
        let job_id = Self::generate_job_id(data);
        tracing::info!("Manual dispatch recorded for order {} as {}", data.order_id, job_id);

        Ok(DispatchResult {
            success: true,
            provider_job_id: Some(job_id),
            tracking_url: None,
            raw_response: None,
            error: None,
            provider_name: Self::NAME.to_string(),
            status_hint: DeliveryStatusHint::ManualConfirmed,
        })
    }

    async fn cancel(&self, _provider_job_id: &str) -> Result<CancelResult, ProviderError> {
        Ok(CancelResult::ok(None))
    }

    async fn get_estimate(&self, _request: &EstimateRequest) -> Result<EstimateResult, ProviderError> {
        Ok(EstimateResult {
            success: true,
            amount_minor: Some(0),
            currency: None,
            eta_minutes: None,
            error: None,
            raw_response: None,
            provider_name: Self::NAME.to_string(),
        })
    }
}
