//! Prometheus exporter for PurpleAir sensors.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use purpleair_exporter::config::normalize_listen;
use purpleair_exporter::{ExporterConfig, HttpFetcher, HttpServer, init_tracing};

/// Prometheus exporter for PurpleAir sensors.
#[derive(Parser, Debug)]
#[command(name = "purpleair-exporter")]
#[command(about = "Export PurpleAir sensor readings as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides LISTEN, PORT and config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides config.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration; validated once overrides are applied
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::read_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    let listen_env = std::env::var("LISTEN").ok();
    let port_env = std::env::var("PORT").ok();
    config.apply_listen_overrides(
        args.listen.as_deref(),
        listen_env.as_deref(),
        port_env.as_deref(),
    )?;

    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_tracing(&config.logging)?;

    info!("Starting PurpleAir Exporter");

    let listen_addr: SocketAddr = normalize_listen(&config.server.listen)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let fetcher = Arc::new(HttpFetcher::new(&config.sensor)?);
    info!(
        sensor_port = config.sensor.port,
        timeout_secs = config.sensor.timeout_secs,
        "Sensor client ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(fetcher, listen_addr, config.server.path.clone());
    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
