// THEORY:
// `fog_vision_server` exposes the stateless analysis engine over HTTP. It is the
// service the capture client talks to, and it can be embedded (tests start it on an
// ephemeral port) or run through the `standalone` binary.
//
// Key architectural principles:
// 1.  **No Session State**: Every request is analyzed on its own. The only shared values
//     are the default thresholds and a semaphore bounding concurrent analyses.
// 2.  **Off the Reactor**: Analysis is CPU bound and runs on `spawn_blocking`, so a burst
//     of large images never stalls the accept loop or the health endpoint.
// 3.  **One Error Shape**: Every failure is an `ApiError` and leaves as `{"detail": ...}`.

pub mod config;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use fog_vision::ThresholdConfig;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use config::ServerArgs;
pub use routes::ApiError;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Used for any threshold a request leaves out.
    pub thresholds: ThresholdConfig,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub analysis_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: config::DEFAULT_BIND.to_string(),
            thresholds: ThresholdConfig::default(),
            allowed_origins: config::DEFAULT_ALLOWED_ORIGINS
                .split(',')
                .map(str::to_string)
                .collect(),
            max_upload_bytes: config::DEFAULT_MAX_UPLOAD_BYTES,
            analysis_workers: num_cpus::get().max(1),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub defaults: ThresholdConfig,
    pub workers: Arc<Semaphore>,
}

/// Build the application router for `config`.
pub fn router(config: &ServerConfig) -> anyhow::Result<Router> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {origin:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let state = AppState {
        defaults: config.thresholds,
        workers: Arc::new(Semaphore::new(config.analysis_workers.max(1))),
    };

    Ok(Router::new()
        .route("/detect-fog", post(routes::detect_fog))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind `config.bind_addr` and serve in a background task.
///
/// Returns the bound address, which differs from the configured one when port 0 was
/// requested.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let app = router(&config)?;
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    info!(
        %addr,
        laplacian_threshold = config.thresholds.laplacian_threshold,
        std_dev_threshold = config.thresholds.std_dev_threshold,
        workers = config.analysis_workers,
        "fog detection service listening"
    );

    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("server stopped: {err}");
        }
    });

    Ok((addr, server))
}
