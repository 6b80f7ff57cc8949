pub mod models;
pub mod resolve;
pub mod readiness;
pub mod orchestrator;

pub use models::{CancelOutcome, CancelStatus, DispatchAttempt, DispatchOutcome};
pub use readiness::{check_readiness, Readiness, ReadinessStatus};
pub use orchestrator::DispatchService;
