//! Configuration management for the file depot server
//!
//! Separates startup configuration (requires restart) from runtime
//! configuration (safe to update while the server is running).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Complete server configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

/// Configuration that requires a server restart to take effect
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    /// IP address to bind the control connection (restart required)
    pub bind_address: String,

    /// Port for the control connection (restart required)
    pub port: u16,

    /// Root directory of the managed file store (restart required)
    pub store_root: String,

    /// Read timeout applied to client commands and upload bodies
    pub read_timeout_secs: u64,

    /// Maximum accepted command line length
    pub max_command_length: usize,

    /// Maximum accepted username/password length
    pub max_username_length: usize,
}

/// Configuration that can be updated at runtime
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Maximum concurrent authenticated clients
    pub max_clients: usize,

    /// Maximum file upload size in MB
    pub max_file_size_mb: u64,
}

/// Thread-safe runtime configuration wrapper
pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    /// (`DEPOT_`-prefixed variables).
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(Environment::with_prefix("DEPOT").separator("_"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Split into startup (immutable) and runtime (mutable) parts
    pub fn split(self) -> (StartupConfig, SharedRuntimeConfig) {
        let runtime = Arc::new(RwLock::new(self.runtime));
        (self.startup, runtime)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.startup.store_root.is_empty() {
            return Err(config::ConfigError::Message(
                "store_root cannot be empty".into(),
            ));
        }

        if self.startup.max_command_length == 0 {
            return Err(config::ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        if self.runtime.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.runtime.max_file_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Bind address and port as a socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Store root as a PathBuf
    pub fn store_root_path(&self) -> PathBuf {
        PathBuf::from(&self.store_root)
    }

    /// Read timeout as a Duration
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_timeout_secs)
    }
}

impl RuntimeConfig {
    /// Maximum upload size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}
