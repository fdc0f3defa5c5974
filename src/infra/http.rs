//! HTTP observability surfaces: health probes and metrics exposition.
//!
//! Each server runs on a dedicated thread with its own current-thread
//! tokio runtime and shuts down gracefully when signalled. Listeners are
//! bound synchronously so bind failures surface to the caller. Access logs
//! are not emitted.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::core::metrics::{MetricsRegistry, EXPOSITION_CONTENT_TYPE};

/// Predicate reporting whether the runtime is ready to accept work.
pub type ReadinessCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// State backing the health endpoints.
#[derive(Clone)]
pub struct HealthState {
    started_at: Instant,
    readiness: ReadinessCheck,
}

impl HealthState {
    /// Create health state with the given readiness predicate.
    #[must_use]
    pub fn new(readiness: ReadinessCheck) -> Self {
        Self {
            started_at: Instant::now(),
            readiness,
        }
    }
}

/// Router serving `GET /healthz` and `GET /readyz`; other paths 404.
#[must_use]
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .fallback(not_found)
        .with_state(state)
}

/// Router serving `GET /metrics`; other paths 404.
#[must_use]
pub fn metrics_router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .with_state(registry)
}

async fn healthz(State(state): State<HealthState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn readyz(State(state): State<HealthState>) -> impl IntoResponse {
    let ready = (state.readiness.as_ref())();
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(json!({ "ready": ready })))
}

async fn metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        registry.exposition_text(),
    )
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Handle to a running HTTP server thread.
///
/// Dropping the handle signals graceful shutdown and joins the thread.
pub struct HttpServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl HttpServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal graceful shutdown and wait for the server thread to exit.
    pub fn stop(mut self) {
        self.signal_and_join();
    }

    fn signal_and_join(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        self.signal_and_join();
    }
}

/// Serve a router on `0.0.0.0:{port}` from a dedicated thread.
///
/// # Errors
///
/// `io::Error` if the listener cannot be bound or the thread cannot be
/// spawned.
pub fn serve(name: &str, port: u16, router: Router) -> io::Result<HttpServerHandle> {
    let listener = std::net::TcpListener::bind(("0.0.0.0", port))?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "failed to build http runtime");
                    return;
                }
            };
            rt.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(l) => l,
                    Err(e) => {
                        error!(error = %e, "failed to adopt http listener");
                        return;
                    }
                };
                let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                if let Err(e) = server.await {
                    error!(error = %e, "http server error");
                }
            });
            debug!("http server stopped");
        })?;

    Ok(HttpServerHandle {
        addr,
        shutdown: Some(shutdown_tx),
        thread: Some(thread),
    })
}
