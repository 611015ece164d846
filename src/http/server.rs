//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::router;
use crate::admission::AdmissionEngine;
use crate::error::{NetwardenError, Result};

/// HTTP server fronted by the admission filter.
pub struct HttpServer {
    /// Bound listener
    listener: TcpListener,
    /// The admission engine shared with every request
    engine: Arc<AdmissionEngine>,
}

impl HttpServer {
    /// Bind a listener on `addr`.
    pub async fn bind(addr: SocketAddr, engine: Arc<AdmissionEngine>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(addr = %addr, error = %e, "Failed to bind HTTP listener");
            NetwardenError::Io(e)
        })?;
        Ok(Self { listener, engine })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server fails.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Starting HTTP server with graceful shutdown");

        let app = router(self.engine).into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                NetwardenError::Io(e)
            })
    }
}
