//! Server configuration read from the environment.

use thiserror::Error;

use crate::storage::StorageConfig;

/// Errors that can occur while reading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings of the HTTP front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Path to the Sled database directory
    pub storage_path: String,
    /// Display name of the workspace root
    pub project_name: String,
    /// Seed the demo namespace when storage is empty
    pub seed_sample: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            storage_path: StorageConfig::default().path,
            project_name: "PROJECT".to_string(),
            seed_sample: true,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup; missing keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PORT",
                    value: port.clone(),
                })?;
        }

        if let Some(path) = lookup("STORAGE_PATH") {
            config.storage_path = path;
        }

        if let Some(name) = lookup("PROJECT_NAME") {
            config.project_name = name;
        }

        if let Some(seed) = lookup("SEED_SAMPLE") {
            config.seed_sample = match seed.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SEED_SAMPLE",
                        value: seed,
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.trim().is_empty() {
            return Err(ConfigError::Invalid("storage path is empty".to_string()));
        }
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::Invalid("project name is empty".to_string()));
        }
        Ok(())
    }

    /// Storage settings derived from this configuration
    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(&self.storage_path)
    }
}
