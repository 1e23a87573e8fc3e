//! The transport host.
//!
//! [`TransportHost`] binds a [`Router`] to a TCP listener and serves it on a
//! background task until its [`ShutdownSignal`] fires. It then stops
//! accepting, gives open connections the configured window to finish, and
//! reports completion on a one-shot channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_server::{Router, TransportHost};
//! use tokio::sync::oneshot;
//!
//! let (done_tx, done_rx) = oneshot::channel();
//! TransportHost::from_env(router)?.start(done_tx).await?;
//!
//! // Resolves after Ctrl-C and the drain window.
//! let _ = done_rx.await;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tessera_config::ConfigLoader;
use tessera_core::transport::{classify_write_failure, empty_response, WriteFailure};
use tessera_core::HttpResponse;
use tessera_telemetry::Team;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::router::Router;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves a route table over HTTP/1.1.
#[derive(Debug)]
pub struct TransportHost {
    config: ServerConfig,
    router: Router,
}

impl TransportHost {
    /// Creates a host for `router`.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// Creates a host listening on `SERVER_PORT` (default `8080`).
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the environment cannot be parsed.
    pub fn from_env(router: Router) -> Result<Self, ServerError> {
        let env = ConfigLoader::new().with_dotenv()?.with_env().load()?;
        Ok(Self::new(ServerConfig::from_env_config(&env), router))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Starts serving in the background and listens for Ctrl-C.
    ///
    /// See [`start_with_shutdown`](Self::start_with_shutdown).
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(self, done: oneshot::Sender<()>) -> Result<SocketAddr, ServerError> {
        self.start_with_shutdown(ShutdownSignal::with_os_signals(), done)
            .await
    }

    /// Binds the listener, then serves on a background task until `shutdown`
    /// fires.
    ///
    /// Returns the bound address. `done` is sent exactly once, after the
    /// drain window. If binding fails, the error is logged and returned and
    /// `done` is dropped, which also wakes its receiver.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn start_with_shutdown(
        self,
        shutdown: ShutdownSignal,
        done: oneshot::Sender<()>,
    ) -> Result<SocketAddr, ServerError> {
        let listener = self.bind().await.map_err(|e| {
            tracing::error!(team = %Team::Ops, error = %e, "Server startup failed");
            e
        })?;
        let addr = local_addr(&listener, &self.config)?;

        tokio::spawn(async move {
            self.serve(listener, shutdown).await;
            // The caller may have stopped waiting.
            let _ = done.send(());
        });

        Ok(addr)
    }

    /// Serves on the current task until `shutdown` fires and the drain
    /// window has passed.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, routes = self.router.route_count(), "Server started");
        }

        let host = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let token = tracker.acquire();
                            let host = Arc::clone(&host);
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                host.handle_connection(stream, remote_addr, shutdown).await;
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(team = %Team::Ops, error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        drop(listener);

        let window = host.config.shutdown_timeout();
        tracing::debug!(
            window = ?window,
            connections = tracker.active_connections(),
            "Draining connections"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("Server shutdown");
            }
            () = tokio::time::sleep(window) => {
                tracing::error!(
                    team = %Team::Ops,
                    connections = tracker.active_connections(),
                    "Server shutdown failed: drain window elapsed"
                );
            }
        }
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) {
        let io = TokioIo::new(stream);
        let host = Arc::clone(&self);

        let service = service_fn(move |req: Request<Incoming>| {
            let host = Arc::clone(&host);
            async move { Ok::<_, Infallible>(host.handle_request(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        let result = tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        };

        if let Err(e) = result {
            match classify_write_failure(&e) {
                WriteFailure::PeerDisconnected => {
                    tracing::warn!(remote_addr = %remote_addr, error = %e, "Peer disconnected");
                }
                WriteFailure::Other => {
                    tracing::error!(
                        team = %Team::Dev,
                        remote_addr = %remote_addr,
                        error = %e,
                        "Connection failed"
                    );
                }
            }
        }
    }

    async fn handle_request(&self, req: Request<Incoming>) -> HttpResponse {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let timeout = self.config.request_timeout();

        tracing::debug!(method = %method, path = %path, "Request received");

        let Some(matched) = self.router.match_route(&method, &path) else {
            tracing::debug!(method = %method, path = %path, "No route");
            return empty_response(StatusCode::NOT_FOUND);
        };
        let (handler, params) = matched.into_parts();

        let (mut parts, body) = req.into_parts();
        let body: Bytes = match tokio::time::timeout(timeout, body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                tracing::warn!(path = %path, error = %e, "Failed to read request body");
                return empty_response(StatusCode::BAD_REQUEST);
            }
            Err(_) => {
                tracing::warn!(path = %path, "Request body collection timed out");
                return empty_response(StatusCode::REQUEST_TIMEOUT);
            }
        };

        parts.extensions.insert(params);
        let request = Request::from_parts(parts, body);

        if let Ok(response) = tokio::time::timeout(timeout, handler(request)).await {
            response
        } else {
            tracing::warn!(method = %method, path = %path, "Handler execution timed out");
            empty_response(StatusCode::GATEWAY_TIMEOUT)
        }
    }
}

fn local_addr(listener: &TcpListener, config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    listener.local_addr().map_err(|source| ServerError::Bind {
        addr: config
            .socket_addr()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0))),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalid_address_is_reported() {
        let host = TransportHost::new(
            ServerConfig::builder().http_addr("not-an-address").build(),
            Router::new(),
        );
        let (done_tx, done_rx) = oneshot::channel();

        let result = host.start_with_shutdown(ShutdownSignal::new(), done_tx).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
        // The sender was dropped, so waiters are released.
        assert!(done_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let host = TransportHost::new(
            ServerConfig::builder().http_addr(addr.to_string()).build(),
            Router::new(),
        );
        let result = host.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_done_is_signalled_after_shutdown() {
        let host = TransportHost::new(
            ServerConfig::builder()
                .http_addr("127.0.0.1:0")
                .shutdown_timeout(Duration::from_millis(100))
                .build(),
            Router::new(),
        );
        let shutdown = ShutdownSignal::new();
        let (done_tx, done_rx) = oneshot::channel();

        let addr = host
            .start_with_shutdown(shutdown.clone(), done_tx)
            .await
            .unwrap();
        assert_ne!(addr.port(), 0);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .expect("done should be signalled")
            .expect("sender should not be dropped");
    }
}
