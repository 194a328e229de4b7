//! Redress API configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// API service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Postgres connection URL; in-memory store when absent
    pub database_url: Option<String>,
    /// Dev ledger auto-mine interval in milliseconds
    pub mine_interval_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            database_url: None,
            mine_interval_ms: 2000,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment and .env file
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        // Platform-provided PORT takes priority
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }

        if let Ok(host) = std::env::var("REDRESS_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("REDRESS_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                cfg.database_url = Some(url);
            }
        }
        if let Ok(val) = std::env::var("REDRESS_MINE_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                cfg.mine_interval_ms = v;
            }
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ApiConfig::default();
        assert_eq!(cfg.port, 5001);
        assert!(cfg.database_url.is_none());
    }
}
