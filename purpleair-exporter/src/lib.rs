//! Prometheus exporter for PurpleAir air quality sensors.
//!
//! Each scrape of the exporter queries a sensor's local `/json` endpoint,
//! once per requested averaging period, and translates the document into
//! Prometheus metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Prometheus    │────>│   HTTP Server   │────>│    Collector    │
//! │  (?target=...)  │<────│  (exposition)   │<────│ (1s / 2m fetch) │
//! └─────────────────┘     └─────────────────┘     └────────┬────────┘
//!                                                          │
//!                                                 ┌────────▼────────┐
//!                                                 │ PurpleAir /json │
//!                                                 └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! purpleair-exporter --config config.json5
//! curl 'http://localhost:2020/purpleair?target=192.168.1.50&period=live'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod catalog;
pub mod collector;
pub mod config;
pub mod exposition;
pub mod fetch;
pub mod http;
pub mod payload;
pub mod request;

pub use collector::{Collection, Collector, DeviceSource, MetricEvent};
pub use config::{ConfigError, ExporterConfig, LogFormat, LoggingConfig};
pub use fetch::{FetchError, HttpFetcher, PeriodFetcher};
pub use http::HttpServer;
pub use payload::{DecodeError, SensorPayload};
pub use request::{Period, PeriodSelection, RequestValidationError, ScrapeRequest};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
