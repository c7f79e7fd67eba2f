//! Service configuration
//!
//! Values are layered, later wins:
//!
//! 1. built-in defaults, adjusted per deployment environment (`CONFIG_ENV`)
//! 2. an optional TOML file named by `LOYALTY_CONFIG`
//! 3. individual environment overrides (`LOYALTY_MODEL`, `PORT`, ...)
//!
//! Secrets never live here; the API key is read by the client factory.
//!
//! # Example
//!
//! ```no_run
//! use loyalty_runtime::config::ServiceConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::from_env()?;
//!
//! println!("Model: {}", config.llm.model);
//! println!("Listening on {}", config.server.socket_addr());
//! # Ok(())
//! # }
//! ```

use crate::retry::RetryPolicy;
use loyalty_core::{CompletionOptions, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown deployment environment
    #[error("invalid environment: {0}")]
    InvalidEnvironment(String),

    /// Configuration file could not be read
    #[error("failed to read {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// I/O error message
        message: String,
    },

    /// Configuration file is not valid TOML for this schema
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// An environment override has an unusable value
    #[error("invalid value for {key}: {value:?}")]
    InvalidOverride {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// Configuration validation failed
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for ConfigurationError {
    fn from(err: ConfigError) -> Self {
        Self::Invalid(err.to_string())
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment (local)
    Development,
    /// Staging environment (pre-production)
    Staging,
    /// Production environment
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl Environment {
    /// Check if this is production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    const fn default_log_level(self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Staging => "info",
            Self::Production => "warn",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
    /// Maximum output tokens per request
    pub max_tokens: u32,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Request a JSON object response format
    pub json_mode: bool,
    /// Override for the API base URL
    pub api_base: Option<String>,
}

impl LlmConfig {
    /// Validate model settings
    ///
    /// # Errors
    ///
    /// Returns error if a setting is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Validation("model cannot be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Validation("max_tokens must be > 0".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation("timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Per-attempt timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Options applied to every completion request
    #[must_use]
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            json_mode: self.json_mode,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: loyalty_openai::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 60,
            json_mode: true,
            api_base: None,
        }
    }
}

/// Retry budget and backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request
    pub max_attempts: u32,
    /// First backoff delay in milliseconds
    pub initial_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl RetryConfig {
    /// Validate retry settings
    ///
    /// # Errors
    ///
    /// Returns error if a setting is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation("max_attempts must be > 0".to_string()));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(ConfigError::Validation("multiplier must be >= 1.0".to_string()));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::Validation(
                "max_delay_ms must be >= initial_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the backoff policy
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .multiplier(self.multiplier)
            .build()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            multiplier: 2.0,
        }
    }
}

/// Pipeline run limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent driver evaluations; 0 evaluates all drivers at once
    pub max_concurrent_drivers: usize,
    /// Whole-run timeout in seconds
    pub timeout_secs: u64,
}

impl PipelineConfig {
    /// Validate pipeline settings
    ///
    /// # Errors
    ///
    /// Returns error if the timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "pipeline timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Run timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective concurrency for a catalog of `drivers` drivers
    #[must_use]
    pub fn concurrency_for(&self, drivers: usize) -> usize {
        match self.max_concurrent_drivers {
            0 => drivers.max(1),
            limit => limit,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_drivers: 0,
            timeout_secs: 300,
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind_addr: String,
    /// Port
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` to bind
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an `EnvFilter` string)
    pub log_level: String,
    /// Install the Prometheus recorder and expose `/metrics`
    pub metrics_enabled: bool,
}

impl ObservabilityConfig {
    /// Validate observability configuration
    ///
    /// # Errors
    ///
    /// Returns error if the log level is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Validation("log_level cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Language model settings
    pub llm: LlmConfig,
    /// Retry budget and backoff
    pub retry: RetryConfig,
    /// Pipeline limits
    pub pipeline: PipelineConfig,
    /// HTTP listener
    pub server: ServerConfig,
    /// Logging and metrics
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl ServiceConfig {
    /// Defaults for a deployment environment
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig {
                log_level: environment.default_log_level().to_string(),
                ..ObservabilityConfig::default()
            },
        }
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if the file or an override cannot be parsed, or the
    /// result is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration, reading variables through `lookup`
    ///
    /// # Errors
    ///
    /// Returns error if the file or an override cannot be parsed, or the
    /// result is invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("CONFIG_ENV") {
            Some(name) => name.parse()?,
            None => Environment::Development,
        };
        let mut config = Self::for_environment(environment);

        if let Some(path) = lookup("LOYALTY_CONFIG") {
            let text = std::fs::read_to_string(Path::new(&path)).map_err(|err| ConfigError::Io {
                path: path.clone(),
                message: err.to_string(),
            })?;
            config = config.overlay_toml(&text)?;
        }

        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay a TOML document; keys it omits keep their current values
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid TOML for this schema
    pub fn overlay_toml(&self, text: &str) -> Result<Self, ConfigError> {
        let overlay: toml::Table = text.parse().map_err(|err: toml::de::Error| {
            ConfigError::Parse(err.message().to_string())
        })?;
        let mut base = toml::Value::try_from(self)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;

        if let toml::Value::Table(table) = &mut base {
            merge_tables(table, overlay);
        }

        base.try_into()
            .map_err(|err: toml::de::Error| ConfigError::Parse(err.message().to_string()))
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("LOYALTY_MODEL") {
            self.llm.model = model;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.observability.log_level = level;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        override_parsed(lookup, "LOYALTY_TEMPERATURE", &mut self.llm.temperature)?;
        override_parsed(lookup, "LOYALTY_MAX_TOKENS", &mut self.llm.max_tokens)?;
        override_parsed(lookup, "LOYALTY_MAX_ATTEMPTS", &mut self.retry.max_attempts)?;
        override_parsed(
            lookup,
            "LOYALTY_MAX_CONCURRENT_DRIVERS",
            &mut self.pipeline.max_concurrent_drivers,
        )?;
        override_parsed(
            lookup,
            "LOYALTY_PIPELINE_TIMEOUT_SECS",
            &mut self.pipeline.timeout_secs,
        )?;
        override_parsed(lookup, "PORT", &mut self.server.port)?;
        Ok(())
    }

    /// Validate entire configuration
    ///
    /// # Errors
    ///
    /// Returns error if any configuration section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.retry.validate()?;
        self.pipeline.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidOverride { key, value: raw })?;
    }
    Ok(())
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}
