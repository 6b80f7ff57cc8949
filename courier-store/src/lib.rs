pub mod app_config;
pub mod database;
pub mod order_repo;
pub mod shipment_repo;
pub mod audit_repo;
pub mod redis_repo;
pub mod events;
pub mod memory;

pub use database::DbClient;
pub use order_repo::PgOrderStore;
pub use shipment_repo::PgShipmentStore;
pub use audit_repo::PgAuditLog;
pub use redis_repo::RedisClient;
pub use events::{EventProducer, KafkaAuditLog};
pub use memory::InMemoryStore;

use courier_core::StoreError;

/// Wraps a backend failure (sqlx, redis, kafka) into the store taxonomy.
pub(crate) fn backend<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Backend(err.to_string())
}
