//! Configuration management for the `Wanderlens` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WanderlensError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `Wanderlens` application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanderlensConfig {
    /// Ideas, detail and itinerary service settings
    #[serde(default)]
    pub services: ServicesConfig,
    /// Accessibility classification settings
    #[serde(default)]
    pub accessibility: AccessibilityConfig,
    /// Durable storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the idea generation host (ideas, detail, itinerary endpoints)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the idea generation host
    #[serde(default = "default_services_base_url")]
    pub base_url: String,
    /// Timeout for the ideas call in seconds; inference upstream is slow
    #[serde(default = "default_ideas_timeout")]
    pub ideas_timeout_seconds: u32,
    /// Timeout for detail and itinerary calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// Retries for JSON calls, 0 disables retrying
    #[serde(default)]
    pub max_retries: u32,
}

/// Settings for the chat completion service used to classify accessibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessibilityConfig {
    /// OpenAI compatible API root
    #[serde(default = "default_accessibility_base_url")]
    pub base_url: String,
    /// Bearer token; without it every classification falls back to all-false
    pub api_key: Option<String>,
    #[serde(default = "default_accessibility_model")]
    pub model: String,
    #[serde(default = "default_accessibility_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u32,
    /// Classify the places of one result concurrently instead of one by one
    #[serde(default)]
    pub concurrent: bool,
}

/// Durable storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage directory location
    #[serde(default = "default_storage_location")]
    pub location: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Request body limit in MB, must leave room for a 4.5 MB image
    #[serde(default = "default_max_upload")]
    pub max_upload_mb: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_services_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_ideas_timeout() -> u32 {
    300
}

fn default_request_timeout() -> u32 {
    60
}

fn default_accessibility_base_url() -> String {
    "https://api.studio.nebius.ai/v1".to_string()
}

fn default_accessibility_model() -> String {
    "meta-llama/Meta-Llama-3.1-405B-Instruct".to_string()
}

fn default_accessibility_max_tokens() -> u32 {
    200
}

fn default_storage_location() -> String {
    "~/.local/share/wanderlens".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_max_upload() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: default_services_base_url(),
            ideas_timeout_seconds: default_ideas_timeout(),
            request_timeout_seconds: default_request_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            base_url: default_accessibility_base_url(),
            api_key: None,
            model: default_accessibility_model(),
            max_tokens: default_accessibility_max_tokens(),
            timeout_seconds: default_request_timeout(),
            concurrent: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: default_storage_location(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            max_upload_mb: default_max_upload(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for WanderlensConfig {
    fn default() -> Self {
        Self {
            services: ServicesConfig::default(),
            accessibility: AccessibilityConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WanderlensConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // WANDERLENS_ACCESSIBILITY__API_KEY -> accessibility.api_key
        builder = builder.add_source(
            Environment::with_prefix("WANDERLENS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WanderlensConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wanderlens").join("config.toml"))
    }

    /// Storage directory with a leading `~` expanded
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        expand_home(&self.storage.location)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.services.base_url.is_empty() {
            self.services.base_url = default_services_base_url();
        }
        if self.services.ideas_timeout_seconds == 0 {
            self.services.ideas_timeout_seconds = default_ideas_timeout();
        }
        if self.services.request_timeout_seconds == 0 {
            self.services.request_timeout_seconds = default_request_timeout();
        }
        if self.accessibility.base_url.is_empty() {
            self.accessibility.base_url = default_accessibility_base_url();
        }
        if self.accessibility.model.is_empty() {
            self.accessibility.model = default_accessibility_model();
        }
        if self.accessibility.max_tokens == 0 {
            self.accessibility.max_tokens = default_accessibility_max_tokens();
        }
        if self.accessibility.timeout_seconds == 0 {
            self.accessibility.timeout_seconds = default_request_timeout();
        }
        if self
            .accessibility
            .api_key
            .as_ref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.accessibility.api_key = None;
        }
        if self.storage.location.is_empty() {
            self.storage.location = default_storage_location();
        }
        if self.server.port == 0 {
            self.server.port = default_server_port();
        }
        if self.server.max_upload_mb == 0 {
            self.server.max_upload_mb = default_max_upload();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.services.ideas_timeout_seconds < 120 {
            return Err(WanderlensError::config(
                "Ideas timeout must be at least 120 seconds, the service runs heavy inference",
            )
            .into());
        }

        if self.services.ideas_timeout_seconds > 1800 {
            return Err(
                WanderlensError::config("Ideas timeout cannot exceed 1800 seconds").into(),
            );
        }

        if self.services.request_timeout_seconds > 600 {
            return Err(
                WanderlensError::config("Request timeout cannot exceed 600 seconds").into(),
            );
        }

        if self.services.max_retries > 10 {
            return Err(WanderlensError::config("Max retries cannot exceed 10").into());
        }

        if self.accessibility.max_tokens > 4096 {
            return Err(WanderlensError::config(
                "Accessibility max tokens cannot exceed 4096",
            )
            .into());
        }

        if self.accessibility.timeout_seconds > 600 {
            return Err(WanderlensError::config(
                "Accessibility timeout cannot exceed 600 seconds",
            )
            .into());
        }

        // 4.5 MB image plus multipart framing
        if self.server.max_upload_mb < 5 || self.server.max_upload_mb > 100 {
            return Err(WanderlensError::config(
                "Server upload limit must be between 5 and 100 MB",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WanderlensError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WanderlensError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Services", &self.services.base_url),
            ("Accessibility", &self.accessibility.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WanderlensError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
