use async_trait::async_trait;
use sqlx::PgPool;

use courier_core::{AuditLog, StoreError};
use courier_shared::models::AuditEvent;

use crate::backend;

pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, store_id, actor_type, actor_id, actor_label,
                action, entity_type, entity_id, before, after, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.id)
        .bind(event.store_id)
        .bind(&event.actor.kind)
        .bind(&event.actor.id)
        .bind(&event.actor.label)
        .bind(event.action.as_str())
        .bind(&event.entity.kind)
        .bind(event.entity.id)
        .bind(&event.before)
        .bind(&event.after)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}
