use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use courier_core::{AuditLog, StoreError};
use courier_shared::models::AuditEvent;

use crate::backend;

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!("Sent message to {}/{}: partition {} offset {}", topic, key, delivery.partition, delivery.offset);
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

/// Publishes audit events to a Kafka topic, keyed by store id.
pub struct KafkaAuditLog {
    producer: EventProducer,
    topic: String,
}

impl KafkaAuditLog {
    pub fn new(producer: EventProducer, topic: impl Into<String>) -> Self {
        Self { producer, topic: topic.into() }
    }
}

#[async_trait]
impl AuditLog for KafkaAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&event).map_err(backend)?;
        let key = event.store_id.to_string();
        self.producer
            .publish(&self.topic, &key, &payload)
            .await
            .map_err(backend)
    }
}
