//! Configuration for the order core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Order-core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Read-retry configuration
    pub retry: RetryConfig,

    /// Payment gateway configuration
    pub gateway: GatewayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/orders"),
            service_name: "order-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDbConfig::default(),
            retry: RetryConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
        }
    }
}

/// Retry policy for read-only storage operations
///
/// Reads are retried once with jittered backoff; failed writes are
/// never resumed partway and surface as transient errors instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base backoff before the single read retry (milliseconds)
    pub read_backoff_ms: u64,

    /// Random jitter added to the backoff (milliseconds)
    pub read_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            read_backoff_ms: 50,
            read_jitter_ms: 25,
        }
    }
}

/// Payment gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Shop currency; outbound charge amounts are rendered in it
    pub currency: String,

    /// Message shown to the payer on their handset
    pub payer_message: String,

    /// Note recorded for the payee
    pub payee_note: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            currency: "RWF".to_string(),
            payer_message: "Payment for order".to_string(),
            payee_note: "Kapee Shop".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("ORDER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(currency) = std::env::var("ORDER_CURRENCY") {
            config.gateway.currency = currency;
        }

        if let Ok(note) = std::env::var("ORDER_PAYEE_NOTE") {
            config.gateway.payee_note = note;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "order-core");
        assert_eq!(config.gateway.currency, "RWF");
        assert_eq!(config.retry.read_backoff_ms, 50);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            data_dir = "/tmp/orders"
            service_name = "order-core"
            service_version = "0.1.0"

            [rocksdb]
            write_buffer_size_mb = 32
            max_write_buffer_number = 2
            max_background_jobs = 2

            [retry]
            read_backoff_ms = 100
            read_jitter_ms = 50

            [gateway]
            currency = "EUR"
            payer_message = "Payment for order"
            payee_note = "Test Shop"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway.currency, "EUR");
        assert_eq!(config.rocksdb.write_buffer_size_mb, 32);
    }
}
