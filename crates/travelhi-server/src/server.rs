//! HTTP server lifecycle.
//!
//! [`start_server`] binds the configured address and serves the router
//! until `Ctrl-C`. Open requests finish before it returns; `WebSocket`
//! sessions are dropped with the listener.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerSection;
use crate::router::build_router;
use crate::state::AppState;

/// Bind and serve until shutdown.
///
/// # Errors
///
/// Returns [`ServerError`] if `host:port` does not parse, the port is taken,
/// or accepting connections fails.
pub async fn start_server(config: &ServerSection, state: Arc<AppState>) -> Result<(), ServerError> {
    let address = format!("{}:{}", config.host, config.port);
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| ServerError::Address { address, source })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Travel Hi server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(wait_for_ctrl_c())
        .await
        .map_err(ServerError::Serve)?;

    info!("Travel Hi server stopped");
    Ok(())
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, draining requests"),
        Err(e) => {
            // Without a signal handler the server runs until killed.
            tracing::error!(error = %e, "Cannot install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Failures while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `host:port` is not a socket address.
    #[error("invalid listen address {address:?}")]
    Address {
        /// The rejected `host:port` string.
        address: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not bind.
    #[error("cannot bind {addr}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Accepting or serving connections failed.
    #[error("server stopped with an I/O error")]
    Serve(#[source] std::io::Error),
}
