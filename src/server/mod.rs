//! HTTP surface for duck-console.
//!
//! Serves the console page and a small JSON API around the connection
//! manager, the query executor and the translator.

pub mod handlers;
pub mod response;
pub mod upload;

pub use upload::UploadStore;

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

use crate::connection::ConnectionManager;
use crate::error::{ConsoleError, Result};
use crate::llm::Translator;

/// Shared state handed to every handler.
///
/// The connection manager sits behind one async mutex, so queries, resets and
/// database switches are serialized: a switch waits for the running query
/// (and its retry) to finish before the new handle becomes visible.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<Mutex<ConnectionManager>>,
    /// `None` when no translator could be configured (e.g. missing API key).
    pub translator: Option<Arc<Translator>>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    pub fn new(
        manager: ConnectionManager,
        translator: Option<Translator>,
        uploads: UploadStore,
    ) -> Self {
        Self {
            connections: Arc::new(Mutex::new(manager)),
            translator: translator.map(Arc::new),
            uploads: Arc::new(uploads),
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState, upload_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/tables", get(handlers::list_tables))
        .route("/api/tables/{name}", get(handlers::describe_table))
        .route("/api/query", post(handlers::run_query))
        .route("/api/translate", post(handlers::translate))
        .route("/api/reset", post(handlers::reset))
        .route(
            "/api/database",
            post(handlers::change_database).layer(DefaultBodyLimit::max(upload_limit_bytes)),
        )
        .with_state(state)
}

/// Serves the console on `listener` until `shutdown` resolves, then closes
/// the database handle.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    upload_limit_bytes: usize,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| ConsoleError::internal(format!("Listener has no address: {e}")))?;
    info!(%addr, "Serving duck-console");

    let router = build_router(state.clone(), upload_limit_bytes);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ConsoleError::internal(format!("Server error: {e}")))?;

    info!("Shutting down, closing database connection");
    state.connections.lock().await.close().await;
    Ok(())
}

/// Resolves when the process receives Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
