//! Server configuration.
//!
//! This module provides [`ServerConfig`] and [`ServerConfigBuilder`] for the
//! listener, the artifact store, and the render engine.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use html2pdf_gateway::config::{ServerConfigBuilder, StorageConfig};
//!
//! let config = ServerConfigBuilder::new()
//!     .port(8080)
//!     .storage(StorageConfig::Local { root: "/var/tmp/pdf".into() })
//!     .render_timeout(Duration::from_secs(10))
//!     .build()
//!     .expect("Invalid configuration");
//!
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.render_timeout, Duration::from_secs(10));
//! ```
//!
//! # Environment Configuration
//!
//! With the `env-config` feature, [`env::from_env`] reads the same settings
//! from environment variables and an optional `app.env` file.

use std::path::PathBuf;
use std::time::Duration;

use crate::layout::DEFAULT_LOAD_TIMEOUT_SECS;

/// Default request body limit (10 MiB), which also bounds uploads.
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Errors raised while building a [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A value is out of range or missing.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// `STORAGE_TYPE` is neither `local` nor `s3`.
    #[error("Unknown storage type: {0}")]
    UnknownStorageType(String),
}

impl From<String> for ConfigError {
    fn from(msg: String) -> Self {
        ConfigError::Invalid(msg)
    }
}

impl From<&str> for ConfigError {
    fn from(msg: &str) -> Self {
        ConfigError::Invalid(msg.to_string())
    }
}

/// Deployment environment. Selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Parse `APP_ENV`. Anything unrecognized counts as production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            "test" => Self::Test,
            _ => Self::Production,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Where artifacts are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// A directory on local disk.
    Local { root: PathBuf },
    /// An S3 (or S3-compatible) bucket.
    S3 {
        bucket: String,
        region: String,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        /// Custom endpoint for S3-compatible services.
        endpoint: Option<String>,
    },
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::S3 { .. } => "s3",
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            root: PathBuf::from("./temp"),
        }
    }
}

/// Complete server configuration.
///
/// # Fields Overview
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `port` | 3000 | Listen port |
/// | `host` | `0.0.0.0` | Bind address |
/// | `environment` | development | Log format selector |
/// | `storage` | local `./temp` | Artifact store |
/// | `render_timeout` | 30s | Document load bound |
/// | `chrome_path` | auto-detect | Browser binary |
/// | `keep_uploads` | false | Persist uploaded HTML |
/// | `body_limit` | 10 MiB | Request body limit |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub environment: Environment,
    pub storage: StorageConfig,
    pub render_timeout: Duration,
    pub chrome_path: Option<String>,
    pub keep_uploads: bool,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            environment: Environment::default(),
            storage: StorageConfig::default(),
            render_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            chrome_path: None,
            keep_uploads: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log the effective configuration, secrets omitted.
    pub fn log_summary(&self) {
        log::info!("Server configuration:");
        log::info!("   - Environment: {}", self.environment.as_str());
        log::info!("   - Listen address: {}", self.bind_address());
        match &self.storage {
            StorageConfig::Local { root } => {
                log::info!("   - Storage: local ({})", root.display());
            }
            StorageConfig::S3 {
                bucket,
                region,
                endpoint,
                ..
            } => {
                log::info!(
                    "   - Storage: s3 (bucket: {}, region: {}, endpoint: {})",
                    bucket,
                    region,
                    endpoint.as_deref().unwrap_or("default")
                );
            }
        }
        log::info!("   - Render timeout: {}s", self.render_timeout.as_secs());
        log::info!(
            "   - Chrome path: {}",
            self.chrome_path.as_deref().unwrap_or("auto-detect")
        );
        log::info!("   - Keep uploads: {}", self.keep_uploads);
        log::info!("   - Body limit: {} bytes", self.body_limit);
    }
}

/// Builder for [`ServerConfig`] with validation.
///
/// ```rust
/// use html2pdf_gateway::config::ServerConfigBuilder;
///
/// let result = ServerConfigBuilder::new().port(0).build();
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Upper bound for loading one document.
    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout = timeout;
        self
    }

    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.config.chrome_path = path;
        self
    }

    pub fn keep_uploads(mut self, keep: bool) -> Self {
        self.config.keep_uploads = keep;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.config.body_limit = bytes;
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if:
    /// - `port` is 0
    /// - `host` is empty
    /// - `render_timeout` or `body_limit` is 0
    /// - an S3 bucket name or region is empty
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let config = self.config;

        if config.port == 0 {
            return Err("port must be greater than 0".into());
        }
        if config.host.trim().is_empty() {
            return Err("host must not be empty".into());
        }
        if config.render_timeout.is_zero() {
            return Err("render_timeout must be greater than 0".into());
        }
        if config.body_limit == 0 {
            return Err("body_limit must be greater than 0".into());
        }
        if let StorageConfig::S3 { bucket, region, .. } = &config.storage {
            if bucket.trim().is_empty() {
                return Err("S3 bucket must not be empty".into());
            }
            if region.trim().is_empty() {
                return Err("S3 region must not be empty".into());
            }
        }

        Ok(config)
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration loading.
///
/// # Environment Variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | `PORT` | 3000 | listen port |
/// | `HOST` | `0.0.0.0` | bind address |
/// | `APP_ENV` | development | environment name |
/// | `STORAGE_TYPE` | local | `local` or `s3` |
/// | `STORAGE_LOCAL_PATH` | `./temp` | local root |
/// | `S3_BUCKET` | (required for s3) | bucket name |
/// | `S3_REGION` | us-east-1 | bucket region |
/// | `S3_ACCESS_KEY_ID` / `S3_SECRET_ACCESS_KEY` | unset | credentials |
/// | `S3_ENDPOINT` | unset | S3-compatible endpoint |
/// | `RENDER_TIMEOUT_SECONDS` | 30 | load timeout |
/// | `CHROME_PATH` | auto-detect | browser binary |
/// | `KEEP_UPLOADS` | false | persist uploaded inputs |
/// | `MAX_BODY_BYTES` | 10485760 | request body limit |
#[cfg(feature = "env-config")]
pub mod env {
    use super::*;

    /// Default environment file name.
    pub const ENV_FILE_NAME: &str = "app.env";

    /// Load variables from `app.env` in the working directory.
    pub fn load_env_file() -> Result<std::path::PathBuf, dotenvy::Error> {
        dotenvy::from_filename(ENV_FILE_NAME)
    }

    fn var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_flag(value: &str) -> bool {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

    /// Read the storage section.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownStorageType`] for anything but `local`/`s3`.
    pub fn storage_from_env() -> Result<StorageConfig, ConfigError> {
        let kind = var("STORAGE_TYPE").unwrap_or_else(|| "local".to_string());

        match kind.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageConfig::Local {
                root: var("STORAGE_LOCAL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./temp")),
            }),
            "s3" => Ok(StorageConfig::S3 {
                bucket: var("S3_BUCKET").unwrap_or_default(),
                region: var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: var("S3_ACCESS_KEY_ID"),
                secret_access_key: var("S3_SECRET_ACCESS_KEY"),
                endpoint: var("S3_ENDPOINT"),
            }),
            _ => Err(ConfigError::UnknownStorageType(kind)),
        }
    }

    /// Load the full configuration from the environment.
    ///
    /// Unparseable numeric values fall back to their defaults.
    ///
    /// ```rust,ignore
    /// use html2pdf_gateway::config::env::from_env;
    ///
    /// let config = from_env()?;
    /// config.log_summary();
    /// ```
    pub fn from_env() -> Result<ServerConfig, ConfigError> {
        // Runs before the logger exists; the result is reported by the caller.
        let _ = load_env_file();

        let defaults = ServerConfig::default();

        let port = var("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let timeout_secs = var("RENDER_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_LOAD_TIMEOUT_SECS);

        let body_limit = var("MAX_BODY_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BODY_LIMIT);

        ServerConfigBuilder::new()
            .port(port)
            .host(var("HOST").unwrap_or(defaults.host))
            .environment(
                var("APP_ENV")
                    .map(|v| Environment::parse(&v))
                    .unwrap_or_default(),
            )
            .storage(storage_from_env()?)
            .render_timeout(Duration::from_secs(timeout_secs))
            .chrome_path(var("CHROME_PATH"))
            .keep_uploads(var("KEEP_UPLOADS").is_some_and(|v| parse_flag(&v)))
            .body_limit(body_limit)
            .build()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_flag() {
            assert!(parse_flag("true"));
            assert!(parse_flag("1"));
            assert!(parse_flag("YES"));
            assert!(!parse_flag("false"));
            assert!(!parse_flag("0"));
            assert!(!parse_flag("maybe"));
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
