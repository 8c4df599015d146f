//! Fetching sensor documents over HTTP.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use reqwest::StatusCode;
use tracing::trace;

use crate::config::SensorConfig;
use crate::payload::{DecodeError, SensorPayload};
use crate::request::Period;

/// Error type for a single period fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response code: {0}")]
    UnexpectedStatus(u16),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Source of sensor documents, one call per averaging period.
pub trait PeriodFetcher: Send + Sync {
    fn fetch(
        &self,
        target: IpAddr,
        period: Period,
    ) -> impl Future<Output = Result<SensorPayload, FetchError>> + Send;
}

/// Build the URL of a sensor's JSON document for a period.
pub fn sensor_url(target: IpAddr, port: u16, period: Period) -> String {
    format!(
        "http://{}/json?live={}",
        SocketAddr::new(target, port),
        period.live_param()
    )
}

/// Fetches documents from the sensor's embedded HTTP server.
///
/// Each call is a single attempt bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    port: u16,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from sensor settings.
    pub fn new(config: &SensorConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            port: config.port,
            timeout,
        })
    }

    /// Override the per-fetch deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get(&self, url: &str) -> Result<SensorPayload, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read body: {}", e)))?;

        trace!(url, bytes = body.len(), "Received sensor document");

        Ok(SensorPayload::from_slice(&body)?)
    }
}

impl PeriodFetcher for HttpFetcher {
    async fn fetch(&self, target: IpAddr, period: Period) -> Result<SensorPayload, FetchError> {
        let url = sensor_url(target, self.port, period);

        tokio::time::timeout(self.timeout, self.get(&url))
            .await
            .map_err(|_| {
                FetchError::Transport(format!("request timed out after {:?}", self.timeout))
            })?
    }
}
