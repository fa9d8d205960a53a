//! Verification configuration
//!
//! Loaded from `config/campus_verify.yaml` (or the path in
//! `CAMPUS_VERIFY_CONFIG`). Heuristic vocabularies are constants in
//! [`crate::document::vocabulary`], not configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::document::vocabulary::{ACCEPTED_MIME, MAX_DOCUMENT_BYTES};

/// Env var naming a YAML config file
pub const CONFIG_PATH_ENV: &str = "CAMPUS_VERIFY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub database: DatabaseSettings,
}

/// Upload preconditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_mime")]
    pub accepted_mime: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            accepted_mime: default_mime(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_mime() -> String {
    ACCEPTED_MIME.to_string()
}

fn default_max_bytes() -> u64 {
    MAX_DOCUMENT_BYTES
}

/// Remote function gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_function_name")]
    pub function_name: String,
    /// Name of the env var holding the public API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            function_name: default_function_name(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_function_name() -> String {
    "campus-gateway".to_string()
}

fn default_api_key_env() -> String {
    "CAMPUS_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

/// Identity/session provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Roster database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url_env")]
    pub url_env: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_env: default_database_url_env(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_database_url_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_pool_size() -> u32 {
    5
}

impl VerifyConfig {
    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file named by `CAMPUS_VERIFY_CONFIG`, else defaults with
    /// per-field env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            tracing::info!(path = %path, "Loading verification config");
            return Self::from_file(path);
        }

        let mut config = Self::default();
        if let Ok(url) = std::env::var("CAMPUS_GATEWAY_URL") {
            config.gateway.base_url = url;
        }
        if let Ok(name) = std::env::var("CAMPUS_GATEWAY_FUNCTION") {
            config.gateway.function_name = name;
        }
        if let Ok(url) = std::env::var("CAMPUS_IDENTITY_URL") {
            config.identity.base_url = url;
        }
        if let Ok(size) = std::env::var("DATABASE_POOL_SIZE") {
            config.database.pool_size = size
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    field: "database.pool_size",
                    value: size,
                })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("gateway.base_url", &self.gateway.base_url),
            ("identity.base_url", &self.identity.base_url),
        ] {
            Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
                field,
                value: value.clone(),
            })?;
        }
        if self.gateway.function_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gateway.function_name",
                value: self.gateway.function_name.clone(),
            });
        }
        if self.document.max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "document.max_bytes",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Gateway API key from the env var `gateway.api_key_env` names
    pub fn gateway_api_key(&self) -> Result<String, ConfigError> {
        read_env(&self.gateway.api_key_env)
    }

    /// Identity API key from the env var `identity.api_key_env` names
    pub fn identity_api_key(&self) -> Result<String, ConfigError> {
        read_env(&self.identity.api_key_env)
    }

    pub fn database_url(&self) -> Result<String, ConfigError> {
        read_env(&self.database.url_env)
    }
}

fn read_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}
