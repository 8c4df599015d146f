//! HTTP server for the scrape endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::collector::Collector;
use crate::exposition::{self, CONTENT_TYPE};
use crate::fetch::PeriodFetcher;
use crate::request::{Period, RequestValidationError, ScrapeRequest};

/// Application state shared across handlers.
struct AppState<F> {
    fetcher: Arc<F>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl IntoResponse for RequestValidationError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, format!("{}\n", self)).into_response()
    }
}

/// Create the HTTP router.
pub fn create_router<F>(fetcher: Arc<F>, scrape_path: &str) -> Router
where
    F: PeriodFetcher + 'static,
{
    let state = AppState { fetcher };

    Router::new()
        .route(scrape_path, get(scrape_handler::<F>))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for the scrape endpoint.
async fn scrape_handler<F>(
    State(state): State<AppState<F>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response
where
    F: PeriodFetcher + 'static,
{
    let request = match ScrapeRequest::from_query(&params) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected scrape request");
            return e.into_response();
        }
    };

    let target = request.target;
    debug!(
        %target,
        live = request.periods.contains(Period::Live),
        averaged = request.periods.contains(Period::Averaged),
        "Starting scrape"
    );

    let start = Instant::now();
    let collection = Collector::new(state.fetcher.as_ref(), request)
        .collect()
        .await;
    let duration = start.elapsed();
    let body = exposition::render(&collection, duration);

    debug!(
        %target,
        duration_seconds = duration.as_secs_f64(),
        "Finished scrape"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer<F> {
    fetcher: Arc<F>,
    listen_addr: SocketAddr,
    scrape_path: String,
}

impl<F: PeriodFetcher + 'static> HttpServer<F> {
    /// Create a new HTTP server.
    pub fn new(fetcher: Arc<F>, listen_addr: SocketAddr, scrape_path: String) -> Self {
        Self {
            fetcher,
            listen_addr,
            scrape_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.fetcher, &self.scrape_path);
        let addr = listener.local_addr()?;

        info!(
            %addr,
            path = %self.scrape_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
