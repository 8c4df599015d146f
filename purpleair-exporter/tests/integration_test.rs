//! Integration tests for the PurpleAir exporter.
//!
//! These tests run a mock sensor on an ephemeral port and verify the full
//! flow from HTTP fetch to the rendered exposition.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;

use purpleair_exporter::catalog;
use purpleair_exporter::config::SensorConfig;
use purpleair_exporter::exposition;
use purpleair_exporter::{
    Collector, FetchError, HttpFetcher, HttpServer, Period, PeriodFetcher, PeriodSelection,
    ScrapeRequest,
};

const LOCALHOST: &str = "127.0.0.1";

/// Helper to serve a router on an ephemeral port.
async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A sensor document; `live` documents report different particulate values.
fn document(live: bool) -> serde_json::Value {
    let (uptime, aqi) = if live { (100, 11) } else { (200, 22) };

    json!({
        "SensorId": "abc",
        "DateTime": "2024/05/01T12:00:00z",
        "uptime": uptime,
        "rssi": -60,
        "httpsends": 10,
        "httpsuccess": 9,
        "current_temp_f_680": 212.0,
        "current_humidity_680": 40.0,
        "current_dewpoint_f_680": 32.0,
        "pressure_680": 1013.25,
        "gas_680": 50.0,
        "pm2.5_aqi": aqi,
        "pm2.5_aqi_b": aqi + 1,
        "pm2_5_cf_1": 4.5,
        "p_0_3_um": 500.25,
        "unknown_future_field": {"nested": true}
    })
}

async fn sensor_handler(Query(params): Query<HashMap<String, String>>) -> Response {
    let live = params.get("live").map(String::as_str) == Some("true");
    axum::Json(document(live)).into_response()
}

/// A healthy mock sensor.
fn healthy_sensor() -> Router {
    Router::new().route("/json", get(sensor_handler))
}

fn fetcher(addr: SocketAddr) -> HttpFetcher {
    HttpFetcher::new(&SensorConfig {
        port: addr.port(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn request(periods: PeriodSelection) -> ScrapeRequest {
    ScrapeRequest::new(LOCALHOST.parse().unwrap(), periods)
}

#[tokio::test]
async fn test_fetch_live_and_averaged_documents() {
    let addr = spawn(healthy_sensor()).await;
    let fetcher = fetcher(addr);
    let target: IpAddr = LOCALHOST.parse().unwrap();

    let live = fetcher.fetch(target, Period::Live).await.unwrap();
    let averaged = fetcher.fetch(target, Period::Averaged).await.unwrap();

    assert_eq!(live.sensor_id, "abc");
    assert_eq!(live.pm2_5_aqi, 11.0);
    assert_eq!(averaged.pm2_5_aqi, 22.0);
    assert_eq!(averaged.uptime, 200);
}

#[tokio::test]
async fn test_end_to_end_live_only() {
    let addr = spawn(healthy_sensor()).await;
    let fetcher = fetcher(addr);

    let collection = Collector::new(&fetcher, request(PeriodSelection::LIVE))
        .collect()
        .await;
    let output = exposition::render(&collection, Duration::from_millis(10));

    assert!(output.contains("purpleair_uptime_seconds_total{id=\"abc\"} 100\n"));
    assert!(output.contains("purpleair_rssi_dbm{id=\"abc\"} -60\n"));
    assert!(output.contains("purpleair_http_sends_total{id=\"abc\",status=\"failure\"} 1\n"));
    assert!(output.contains("purpleair_temperature_c{id=\"abc\"} 100\n"));
    assert!(output.contains("purpleair_dewpoint_c{id=\"abc\"} 0\n"));
    assert!(output.contains("purpleair_pressure_pa{id=\"abc\"} 101325\n"));
    assert!(output.contains(
        "purpleair_mass_ugm3{channel=\"A\",id=\"abc\",period=\"1s\",size=\"2.5\",variant=\"CF1\"} 4.5\n"
    ));
    assert!(output.contains(
        "purpleair_particle_count{channel=\"A\",id=\"abc\",period=\"1s\",size=\"0.3\"} 500.25\n"
    ));
    assert!(!output.contains("period=\"2m\""));
    assert!(!output.contains("# ERROR"));
}

#[tokio::test]
async fn test_live_timeout_falls_back_to_averaged() {
    async fn slow_live(Query(params): Query<HashMap<String, String>>) -> Response {
        let live = params.get("live").map(String::as_str) == Some("true");
        if live {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        axum::Json(document(live)).into_response()
    }

    let addr = spawn(Router::new().route("/json", get(slow_live))).await;
    let fetcher = fetcher(addr).with_timeout(Duration::from_millis(300));

    let collection = Collector::new(&fetcher, request(PeriodSelection::BOTH))
        .collect()
        .await;

    assert!(matches!(
        collection.outcomes()[0].result,
        Err(FetchError::Transport(_))
    ));

    let output = exposition::render(&collection, Duration::ZERO);

    // Device metrics come from the averaged document
    assert!(output.contains("purpleair_uptime_seconds_total{id=\"abc\"} 200\n"));
    assert!(!output.contains("# ERROR purpleair_uptime_seconds_total"));

    assert!(output.contains("# ERROR purpleair_pm25_aqi period=\"1s\""));
    assert!(output.contains("# ERROR purpleair_mass_ugm3 period=\"1s\""));
    assert!(output.contains("# ERROR purpleair_particle_count period=\"1s\""));
    assert!(
        output
            .lines()
            .filter(|l| !l.starts_with('#'))
            .all(|l| !l.contains("period=\"1s\""))
    );

    assert!(output.contains("purpleair_pm25_aqi{channel=\"A\",id=\"abc\",period=\"2m\"} 22\n"));
    assert!(output.contains("purpleair_pm25_aqi{channel=\"B\",id=\"abc\",period=\"2m\"} 23\n"));
}

#[tokio::test]
async fn test_malformed_json_everywhere() {
    let addr = spawn(Router::new().route("/json", get(|| async { "{\"SensorId\": \"abc\"," }))).await;
    let fetcher = fetcher(addr);

    let collection = Collector::new(&fetcher, request(PeriodSelection::BOTH))
        .collect()
        .await;

    for outcome in collection.outcomes() {
        assert!(matches!(outcome.result, Err(FetchError::Decode(_))));
    }

    let output = exposition::render(&collection, Duration::ZERO);
    let errors: Vec<&str> = output
        .lines()
        .filter(|l| l.starts_with("# ERROR"))
        .collect();

    assert_eq!(errors.len(), 8 + 2 * 3);
    for identity in catalog::device_identities() {
        let prefix = format!("# ERROR {} ", identity.name);
        assert_eq!(
            errors.iter().filter(|l| l.starts_with(&prefix)).count(),
            1,
            "{}",
            identity.name
        );
    }
    for identity in catalog::periodic_identities() {
        let prefix = format!("# ERROR {} ", identity.name);
        assert_eq!(errors.iter().filter(|l| l.starts_with(&prefix)).count(), 2);
    }

    // No samples at all, only the exporter's own metrics
    assert!(
        output
            .lines()
            .filter(|l| !l.starts_with('#'))
            .all(|l| l.starts_with("purpleair_scrape_"))
    );
}

#[tokio::test]
async fn test_unexpected_status() {
    let addr = spawn(Router::new().route(
        "/json",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
    ))
    .await;
    let fetcher = fetcher(addr);

    let result = fetcher
        .fetch(LOCALHOST.parse().unwrap(), Period::Averaged)
        .await;
    assert!(matches!(result, Err(FetchError::UnexpectedStatus(503))));
}

#[tokio::test]
async fn test_truncated_body_is_transport_error() {
    // Promise more body than is sent, then close the connection
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n{\"SensorId\"")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let fetcher = fetcher(addr);
    let result = fetcher
        .fetch(LOCALHOST.parse().unwrap(), Period::Live)
        .await;
    assert!(
        matches!(result, Err(FetchError::Transport(_))),
        "unexpected result: {:?}",
        result
    );
}

#[tokio::test]
async fn test_http_server_scrape_endpoint() {
    let sensor_addr = spawn(healthy_sensor()).await;
    let fetcher = Arc::new(fetcher(sensor_addr));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let exporter_addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = HttpServer::new(fetcher, exporter_addr, "/purpleair".to_string());
    let server_handle = tokio::spawn(async move {
        let _ = server.serve(listener, shutdown_rx).await;
    });

    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "http://{}/purpleair?target={}&period=avg",
            exporter_addr, LOCALHOST
        ))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("purpleair_uptime_seconds_total{id=\"abc\"} 200"));
    assert!(body.contains("purpleair_scrape_success{period=\"2m\"} 1"));
    assert!(!body.contains("purpleair_scrape_success{period=\"1s\"}"));

    let response = client
        .get(format!("http://{}/purpleair?target=not-an-ip", exporter_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(1), server_handle).await;
}
