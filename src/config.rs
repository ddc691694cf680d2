use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub balance_cache_ttl_ms: i64,
    /// 0 disables the background reconciler.
    pub reconcile_interval_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let balance_cache_ttl_ms = env_map
            .get("BALANCE_CACHE_TTL_MS")
            .map(|s| s.as_str())
            .unwrap_or("3600000")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BALANCE_CACHE_TTL_MS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;

        let reconcile_interval_ms = env_map
            .get("RECONCILE_INTERVAL_MS")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RECONCILE_INTERVAL_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            balance_cache_ttl_ms,
            reconcile_interval_ms,
        })
    }
}
