use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use courier_api::{app, AppState};
use courier_core::AuditLog;
use courier_dispatch::DispatchService;
use courier_provider::ProviderFactory;
use courier_store::app_config::Config;
use courier_store::{
    DbClient, EventProducer, KafkaAuditLog, PgAuditLog, PgOrderStore, PgShipmentStore, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_api=debug,courier_dispatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting courier dispatch API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    // Couriers. A half-configured Kwik section aborts startup here.
    let providers = ProviderFactory::from_config(config.kwik.clone())?;

    // Audit sink
    let audit: Arc<dyn AuditLog> = match &config.kafka {
        Some(kafka) => {
            let producer = EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?;
            tracing::info!("Publishing audit events to {}", kafka.audit_topic);
            Arc::new(KafkaAuditLog::new(producer, &kafka.audit_topic))
        }
        None => Arc::new(PgAuditLog::new(db.pool.clone())),
    };

    let mut service = DispatchService::new(
        Arc::new(PgOrderStore::new(db.pool.clone())),
        Arc::new(PgShipmentStore::new(db.pool.clone())),
        audit,
        Arc::new(providers),
    );

    // Redis dispatch lock
    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).await.context("Failed to connect to Redis")?;
        service = service.with_lock(Arc::new(client), Duration::from_secs(config.dispatch.lock_ttl_seconds));
    }

    let app = app(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
