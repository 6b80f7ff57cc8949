pub mod events;

pub use events::{AuditAction, AuditActor, AuditEntity, AuditEvent, ShipmentRequestedEvent};
