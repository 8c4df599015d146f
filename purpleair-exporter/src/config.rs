//! Configuration for the PurpleAir exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Sensor connection settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scrape endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "0.0.0.0:2020").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for the scrape endpoint (default: "/purpleair").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:2020".to_string()
}

fn default_path() -> String {
    "/purpleair".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// How sensors are contacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// TCP port of the sensor's web server (default: 80).
    #[serde(default = "default_sensor_port")]
    pub port: u16,

    /// Deadline for a single period fetch, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_sensor_port() -> u16 {
    80
}

fn default_timeout() -> u64 {
    10
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: default_sensor_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Normalize a listen address; a bare `:port` binds all interfaces.
pub fn normalize_listen(addr: &str) -> String {
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => addr.to_string(),
    }
}

impl ExporterConfig {
    /// Load and validate configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON5 file without validating it.
    ///
    /// Callers apply overrides and then call [`ExporterConfig::validate`].
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&content)?)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the listen overrides, highest precedence first: an explicit
    /// address, then the `LISTEN` value, then the `PORT` value.
    pub fn apply_listen_overrides(
        &mut self,
        cli: Option<&str>,
        listen_env: Option<&str>,
        port_env: Option<&str>,
    ) -> Result<(), ConfigError> {
        let cli = cli.filter(|s| !s.is_empty());
        let listen_env = listen_env.filter(|s| !s.is_empty());
        let port_env = port_env.filter(|s| !s.is_empty());

        if let Some(addr) = cli.or(listen_env) {
            self.server.listen = normalize_listen(addr);
        } else if let Some(port) = port_env {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid PORT: {}", port)))?;
            self.server.listen = format!("0.0.0.0:{}", port);
        }

        self.validate()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.sensor.port == 0 {
            return Err(ConfigError::Validation("port must be > 0".to_string()));
        }

        // Validate listen address format
        if normalize_listen(&self.server.listen)
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.server.listen
            )));
        }

        // Validate path starts with /
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Scrape path must start with /".to_string(),
            ));
        }

        if self.server.path == "/health" {
            return Err(ConfigError::Validation(
                "Scrape path conflicts with /health".to_string(),
            ));
        }

        Ok(())
    }
}
