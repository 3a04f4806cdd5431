//! HTTP transport for telemetryd.
//!
//! Routes:
//! - `POST /telemetry` → [`IngestService`]
//! - `GET /get_telemetry?limit=N` → [`QueryService`]
//! - `GET /health` → [`HealthService`]

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use crate::service::{HealthService, IngestService, QueryService};
use crate::storage::TelemetryLog;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    ingest: IngestService,
    query: QueryService,
    health: HealthService,
}

impl AppState {
    /// Wire the services to a single shared log.
    #[must_use]
    pub fn new(log: Arc<dyn TelemetryLog>, config: &Config) -> Self {
        Self {
            ingest: IngestService::new(Arc::clone(&log)),
            query: QueryService::new(log, config.query.default_limit, config.max_limit()),
            health: HealthService,
        }
    }
}

#[derive(Debug)]
enum ApiError {
    InvalidBody,
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_validation() {
            Self::InvalidBody
        } else {
            Self::Internal(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidBody => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON" })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!("Telemetry request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TailParams {
    limit: Option<String>,
}

impl TailParams {
    /// An unparseable `limit` is treated as absent.
    fn limit(&self) -> Option<i64> {
        let raw = self.limit.as_deref()?;
        match raw.trim().parse() {
            Ok(limit) => Some(limit),
            Err(_) => {
                warn!("Ignoring unparseable limit {:?}", raw);
                None
            }
        }
    }
}

/// Build the router with all routes and middleware.
#[must_use]
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/telemetry", post(post_telemetry))
        .route("/get_telemetry", get(get_telemetry))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run(config: &Config, log: Arc<dyn TelemetryLog>) -> Result<()> {
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| Error::server(format!("failed to bind {addr}: {err}")))?;

    info!("Telemetry API listening on {}", addr);
    serve(listener, config, log, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server encounters an unrecoverable I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    config: &Config,
    log: Arc<dyn TelemetryLog>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(AppState::new(log, config), &config.server);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| Error::server(format!("HTTP server failed: {err}")))?;

    info!("Telemetry API stopped");
    Ok(())
}

async fn post_telemetry(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let ack = state.ingest.ingest(&body).await?;
    Ok(Json(ack))
}

async fn get_telemetry(
    State(state): State<AppState>,
    Query(params): Query<TailParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let records = state.query.tail(params.limit()).await?;
    Ok(Json(records))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.health())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
