//! The axum app the adapter drives.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each [`TestServer`] builds its own router and state, binds its own
//! listener and shuts down independently, so any number of test clients
//! can coexist in one process.

pub mod graphql;
pub mod ws;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::GRAPHQL_PATH;
use crate::config::ClientOptions;
use crate::engine::Engine;
use crate::error::HarnessError;
use crate::protocol::ConnectionDiagnostics;

/// How long `shutdown` waits for in-flight connections before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// =============================================================================
// APP STATE
// =============================================================================

/// Diagnostics of every WebSocket connection this server accepted.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Arc<ConnectionDiagnostics>>>>,
}

impl ConnectionRegistry {
    pub fn register(&self, diagnostics: Arc<ConnectionDiagnostics>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(diagnostics.handle().id, diagnostics);
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<ConnectionDiagnostics>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// Shared state injected into the GraphQL view.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub options: Arc<ClientOptions>,
    pub connections: ConnectionRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(engine: Engine, options: ClientOptions) -> Self {
        Self { engine, options: Arc::new(options), connections: ConnectionRegistry::default() }
    }
}

/// Router with the GraphQL endpoint registered for every method the
/// conformance suite probes.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let view = get(graphql::graphql_view)
        .post(graphql::graphql_view)
        .put(graphql::graphql_view)
        .patch(graphql::graphql_view)
        .delete(graphql::graphql_view)
        .head(graphql::graphql_view);

    Router::new()
        .route(GRAPHQL_PATH, view)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// TEST SERVER
// =============================================================================

/// A running app on a loopback port.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Bind `options.bind_addr` and serve the app in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(engine: Engine, options: ClientOptions) -> Result<Self, HarnessError> {
        let listener = TcpListener::bind(options.bind_addr.as_str()).await?;
        let addr = listener.local_addr()?;
        let state = AppState::new(engine, options);
        let router = app(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!(error = %e, "test server failed");
            }
        });

        info!(%addr, "test server listening");
        Ok(Self { addr, state, shutdown: Some(shutdown_tx), task: Some(task) })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Absolute HTTP URL for `path`. Absolute URLs pass through unchanged.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Absolute WebSocket URL for `path`.
    #[must_use]
    pub fn ws_url(&self, path: &str) -> String {
        if path.starts_with("ws://") || path.starts_with("wss://") {
            return path.to_owned();
        }
        format!("ws://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Stop accepting connections and wait briefly for open ones to drain.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }
        info!(addr = %self.addr, "test server stopped");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
