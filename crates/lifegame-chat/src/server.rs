//! Chat API server lifecycle.
//!
//! [`start_server`] binds a TCP port and serves the router until `Ctrl-C`.

use std::net::SocketAddr;
use std::sync::Arc;

use lifegame_runner::Completion;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the chat API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Start the chat API server.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot bind,
/// or the server hits a fatal I/O error.
pub async fn start_server<C: Completion + 'static>(
    config: &ServerConfig,
    state: Arc<AppState<C>>,
) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "chat API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("chat API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Errors that can occur when starting or running the chat API server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
