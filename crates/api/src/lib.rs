//! Station Pipeline API Server
//!
//! REST trigger surface over the acquisition pipeline: one-shot fetch
//! triggers, location refresh, latest-sample queries, and a health view
//! of the pipeline state.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fetch_coordinator::FetchCoordinator;
use progress::ProgressTracker;
use readings::SourceKind;
use sample_store::SampleStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod routes;
pub mod settings;

pub use settings::Settings;

/// Application state shared across handlers
pub struct AppState {
    pub store: SampleStore,
    pub coordinator: Arc<FetchCoordinator>,
    pub progress: ProgressTracker,
    /// Timeout applied to user-triggered one-shot fetches
    pub fetch_timeout: Duration,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        store: SampleStore,
        coordinator: Arc<FetchCoordinator>,
        progress: ProgressTracker,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            coordinator,
            progress,
            fetch_timeout,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub busy: bool,
    pub last_errors: HashMap<SourceKind, String>,
    pub sample_counts: HashMap<SourceKind, i64>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/samples/:source", get(routes::samples::get_latest))
        .route("/api/v1/fetch/:source", post(routes::trigger::request_fetch))
        .route(
            "/api/v1/location/refresh",
            post(routes::trigger::request_location_refresh),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline = state.progress.current();

    let mut sample_counts = HashMap::new();
    for source in SourceKind::ALL {
        let count = state.store.sample_count(source).await.unwrap_or(0);
        sample_counts.insert(source, count);
    }

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        busy: pipeline.busy,
        last_errors: pipeline.last_errors,
        sample_counts,
    })
}

/// Map a terminal fetch error to an HTTP status.
pub(crate) fn error_status(error: &fetch_coordinator::FetchError) -> StatusCode {
    use fetch_coordinator::FetchError;
    match error {
        FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FetchError::Network { .. } => StatusCode::BAD_GATEWAY,
        FetchError::Parse(_) => StatusCode::BAD_GATEWAY,
        FetchError::Store(_) | FetchError::Runner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        FetchError::Unconfigured(_) => StatusCode::NOT_IMPLEMENTED,
    }
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already initialized (tests); keep the existing subscriber.
    }
}

/// Run the server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
