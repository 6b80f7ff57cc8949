use courier_provider::KwikConfig;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    /// Absent means the Kwik integration is off; present but incomplete
    /// aborts startup.
    pub kwik: Option<KwikConfig>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_audit_topic")]
    pub audit_topic: String,
}

fn default_audit_topic() -> String { "delivery.audit".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
}

fn default_lock_ttl() -> u64 { 60 }

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { lock_ttl_seconds: default_lock_ttl() }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `COURIER__KWIK__API_KEY=sk_live_...`
            .add_source(config::Environment::with_prefix("COURIER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(
            r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/courier"
            "#,
        );

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.dispatch.lock_ttl_seconds, 60);
        assert!(config.kwik.is_none());
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_kwik_section_with_custom_paths() {
        let config = parse(
            r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/courier"

            [kafka]
            brokers = "localhost:9092"

            [kwik]
            api_key = "sk_test_1"
            merchant_id = "m-1"
            dispatch_path = "/v2/deliveries"
            "#,
        );

        let kwik = config.kwik.unwrap();
        assert_eq!(kwik.merchant_id, "m-1");
        assert_eq!(kwik.dispatch_path, "/v2/deliveries");
        assert_eq!(kwik.cancel_path, "/v1/tasks/{job_id}/cancel");
        assert_eq!(config.kafka.unwrap().audit_topic, "delivery.audit");
    }
}
