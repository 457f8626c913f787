//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default budget for a fresh wallet: $10 in microdollars
pub const DEFAULT_BUDGET_MICRODOLLARS: u64 = 10_000_000;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Local tool-server configuration
    pub server: ServerConfig,
    /// Broker state configuration
    pub broker: BrokerConfig,
    /// Outbound HTTP configuration
    pub http: HttpConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Broker state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Directory holding vault.json, wallet.json and receipts.json
    pub data_dir: PathBuf,
    /// Budget used when the wallet file does not exist yet
    pub default_budget: u64,
    /// Explicit budget from the environment, re-applied at startup
    pub budget_override: Option<u64>,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance from the environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let budget_override = match std::env::var("BUTTERKNIFE_BUDGET") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .context("Invalid BUTTERKNIFE_BUDGET value")?,
            ),
            Err(_) => None,
        };

        let settings = Self {
            server: ServerConfig {
                host: get_env_or_default("SERVER_HOST", "127.0.0.1"),
                port: get_env_or_default("SERVER_PORT", "8791")
                    .parse()
                    .context("Invalid port number")?,
            },
            broker: BrokerConfig {
                data_dir: resolve_data_dir()?,
                default_budget: budget_override.unwrap_or(DEFAULT_BUDGET_MICRODOLLARS),
                budget_override,
            },
            http: HttpConfig {
                timeout: get_env_or_default("REQUEST_TIMEOUT", "30")
                    .parse()
                    .context("Invalid timeout value")?,
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.http.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.broker.data_dir.as_os_str().is_empty() {
            anyhow::bail!("Data directory cannot be empty");
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Path of the vault store file
    pub fn vault_path(&self) -> PathBuf {
        self.broker.data_dir.join("vault.json")
    }

    /// Path of the wallet store file
    pub fn wallet_path(&self) -> PathBuf {
        self.broker.data_dir.join("wallet.json")
    }

    /// Path of the receipt ledger file
    pub fn receipts_path(&self) -> PathBuf {
        self.broker.data_dir.join("receipts.json")
    }
}

/// Resolve the data directory: `BUTTERKNIFE_DATA_DIR` or `~/.butterknife`
fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BUTTERKNIFE_DATA_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".butterknife"))
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
