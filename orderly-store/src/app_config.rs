use std::env;
use std::time::Duration;

use orderly_catalog::Product;
use orderly_order::StatusPolicy;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres URL; the in-memory store is used when absent
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    /// Event bus is disabled when absent
    pub brokers: Option<String>,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_payment_topic")]
    pub payment_topic: String,
    #[serde(default = "default_order_topic_prefix")]
    pub order_topic_prefix: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: None,
            group_id: default_group_id(),
            payment_topic: default_payment_topic(),
            order_topic_prefix: default_order_topic_prefix(),
        }
    }
}

fn default_group_id() -> String {
    "orders-service".to_string()
}

fn default_payment_topic() -> String {
    "payments.succeeded".to_string()
}

fn default_order_topic_prefix() -> String {
    "orders".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_catalog_timeout_ms")]
    pub timeout_ms: u64,
    /// Seed data for the in-memory catalog
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_catalog_timeout_ms(),
            products: Vec::new(),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_catalog_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Payments service URL; the mock gateway is used when absent
    pub base_url: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payment_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            currency: default_currency(),
            timeout_ms: default_payment_timeout_ms(),
        }
    }
}

impl PaymentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_payment_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OrdersConfig {
    #[serde(default)]
    pub status_policy: StatusPolicy,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked developer overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `ORDERLY__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("ORDERLY").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
