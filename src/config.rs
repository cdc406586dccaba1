//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{FeederLinkError, Result};
use crate::exchange::controller::ExchangeSettings;
use crate::exchange::request::RangeToken;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub tag: TagConfig,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tag access configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TagConfig {
    /// Tag image file used by the file transport
    #[serde(default = "default_image_path")]
    pub image_path: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Language code of written text records
    #[serde(default = "default_language")]
    pub language: String,
}

/// Float range request configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RequestConfig {
    /// Namespace prefix of float fields
    #[serde(default = "default_field_root")]
    pub field_root: String,

    #[serde(default = "default_range")]
    pub default_range: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_image_path() -> String { "./tag.ndef".to_string() }
fn default_poll_interval_ms() -> u64 { 250 }
fn default_language() -> String { "en".to_string() }

fn default_field_root() -> String { "Floats".to_string() }
fn default_range() -> String { "-30m".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
            poll_interval_ms: default_poll_interval_ms(),
            language: default_language(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            field_root: default_field_root(),
            default_range: default_range(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use feeder_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Settings handed to the exchange controller
    pub fn exchange_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            field_root: self.request.field_root.clone(),
            language: self.tag.language.clone(),
        }
    }

    /// Configured default range token
    pub fn default_range(&self) -> Result<RangeToken> {
        self.request.default_range.parse()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.tag.poll_interval_ms)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.tag.image_path.is_empty() {
            return Err(invalid("tag image_path cannot be empty"));
        }

        if self.tag.poll_interval_ms == 0 || self.tag.poll_interval_ms > 10000 {
            return Err(invalid("poll_interval_ms must be between 1 and 10000"));
        }

        // Language length must fit the 6 status-byte bits of a text record
        let language = &self.tag.language;
        if language.len() < 2 || language.len() > 63 || !language.is_ascii() {
            return Err(invalid("language must be an ASCII code of 2 to 63 characters"));
        }

        let root = &self.request.field_root;
        if root.is_empty() || root.contains('.') {
            return Err(invalid("field_root must be non-empty and contain no '.'"));
        }

        if self.request.default_range.trim().is_empty() {
            return Err(invalid("default_range cannot be empty"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> FeederLinkError {
    FeederLinkError::Config(toml::de::Error::custom(message))
}
