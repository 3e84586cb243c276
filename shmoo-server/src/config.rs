use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use shmoo_core::{GeneratorConfig, RetentionPolicy};
use shmoo_persistence::connection::DEFAULT_DATABASE_URL;
use shmoo_types::ZERO_ADDRESS;

#[derive(Debug, Error)]
#[error("Invalid {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub in_memory_store: bool,
    pub network: String,
    pub alchemy_api_key: String,
    pub rpc_url: Option<String>,
    pub contract_address: String,
    pub confirmation_timeout_seconds: u64,
    pub confirmed_display_seconds: u64,
    pub simulated_delay_ms: u64,
    pub max_points_retained: usize,
    pub session_timeout_seconds: u64,
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError { key, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Read the configuration from the environment, falling back to defaults
    pub fn new() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            in_memory_store: env_or("IN_MEMORY_STORE", defaults.in_memory_store)?,
            network: env::var("NETWORK").unwrap_or(defaults.network),
            alchemy_api_key: env::var("ALCHEMY_API_KEY").unwrap_or(defaults.alchemy_api_key),
            rpc_url: env::var("RPC_URL").ok().filter(|url| !url.is_empty()),
            contract_address: env::var("CONTRACT_ADDRESS").unwrap_or(defaults.contract_address),
            confirmation_timeout_seconds: env_or(
                "CONFIRMATION_TIMEOUT_SECONDS",
                defaults.confirmation_timeout_seconds,
            )?,
            confirmed_display_seconds: env_or(
                "CONFIRMED_DISPLAY_SECONDS",
                defaults.confirmed_display_seconds,
            )?,
            simulated_delay_ms: env_or("SIMULATED_DELAY_MS", defaults.simulated_delay_ms)?,
            max_points_retained: env_or("MAX_POINTS_RETAINED", defaults.max_points_retained)?,
            session_timeout_seconds: env_or(
                "SESSION_TIMEOUT_SECONDS",
                defaults.session_timeout_seconds,
            )?,
        })
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_seconds),
            confirmed_display: Duration::from_secs(self.confirmed_display_seconds),
            retention: RetentionPolicy::new(self.max_points_retained),
        }
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            in_memory_store: false,
            network: "sepolia".to_string(),
            alchemy_api_key: "demo".to_string(),
            rpc_url: None,
            contract_address: ZERO_ADDRESS.to_string(),
            confirmation_timeout_seconds: 60,
            confirmed_display_seconds: 3,
            simulated_delay_ms: 1500,
            max_points_retained: 1000,
            session_timeout_seconds: 1800,
        }
    }
}
