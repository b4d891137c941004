//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::routes::router;
use crate::contact::ContactService;
use crate::error::{ContactGateError, Result};
use crate::ratelimit::{Clock, SystemClock};

/// HTTP server for the contact form endpoint.
pub struct HttpServer<C: Clock + 'static = SystemClock> {
    /// Address to bind to
    addr: SocketAddr,
    /// The submission handler
    service: Arc<ContactService<C>>,
}

impl<C: Clock + 'static> HttpServer<C> {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, service: Arc<ContactService<C>>) -> Self {
        Self { addr, service }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            ContactGateError::Io(e)
        })?;

        info!(
            addr = %listener.local_addr()?,
            "Starting HTTP server for contact submissions"
        );

        axum::serve(listener, router(self.service))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                ContactGateError::Io(e)
            })
    }
}
