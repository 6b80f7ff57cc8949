use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use courier_core::{DispatchLock, StoreError};

use crate::backend;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn dispatch_lock_key(order_id: Uuid) -> String {
    format!("dispatch:lock:{}", order_id)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn acquire_dispatch_lock(&self, order_id: Uuid, token: &str, ttl_seconds: u64) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = dispatch_lock_key(order_id);

        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    pub async fn release_dispatch_lock(&self, order_id: Uuid, token: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = dispatch_lock_key(order_id);
        // Compare-and-delete: an expired lock may already belong to someone else.
        let script = redis::Script::new(r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#);

        let deleted: i64 = script.key(key).arg(token).invoke_async(&mut conn).await?;
        Ok(deleted == 1)
    }
}

#[async_trait]
impl DispatchLock for RedisClient {
    async fn try_acquire(&self, order_id: Uuid, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let acquired = self
            .acquire_dispatch_lock(order_id, token, ttl.as_secs())
            .await
            .map_err(backend)?;
        debug!("Dispatch lock for order {}: acquired={}", order_id, acquired);
        Ok(acquired)
    }

    async fn release(&self, order_id: Uuid, token: &str) -> Result<(), StoreError> {
        if !self.release_dispatch_lock(order_id, token).await.map_err(backend)? {
            info!("Dispatch lock for order {} was no longer held by this attempt", order_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_scoped_per_order() {
        let id = Uuid::nil();
        assert_eq!(dispatch_lock_key(id), "dispatch:lock:00000000-0000-0000-0000-000000000000");
    }
}
