pub mod models;
pub mod shipment;
pub mod provider;
pub mod repository;

pub use models::{Channel, Customer, DeliverySettings, DispatchMode, Order, ProviderKey};
pub use shipment::{NewShipment, Shipment, ShipmentStatus, ShipmentUpdate, ShipmentWrite};
pub use provider::{
    error_codes, CancelResult, DeliveryProvider, DeliveryStatusHint, DispatchData, DispatchResult,
    EstimateRequest, EstimateResult, Location, Parcel, ProviderError, ProviderResolver,
};
pub use repository::{AuditLog, DispatchLock, OrderStore, ShipmentStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
