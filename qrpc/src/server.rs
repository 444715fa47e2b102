//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! QUIC server.
//!
//! A [`Server`] accepts QUIC connections, accepts bidirectional streams on
//! each connection and hands every stream to the installed
//! [`StreamHandler`] in its own task. Each stream carries exactly one
//! request and one response.
//!
//! The handler is installed with [`Server::upgrade`], wrapped in the
//! server's middleware chain, and can be replaced at any time while the
//! server runs. Streams accepted after the swap see the new handler;
//! streams already running keep the one they started with.
//!
//! # Examples
//!
//! ```rust,no_run
//! use qrpc::config::DEFAULT_MAX_REQUEST_BODY_SIZE;
//! use qrpc::envelope::Response;
//! use qrpc::server::{Server, unary};
//! use qrpc::tls;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::builder()
//!     .with_tls_config(tls::self_signed_server_config(vec!["localhost".into()])?)
//!     .with_default_middlewares(DEFAULT_MAX_REQUEST_BODY_SIZE)
//!     .build();
//!
//! server.upgrade(unary(|_ctx, request| async move {
//!     let mut body = b"echo: ".to_vec();
//!     body.extend_from_slice(&request.body);
//!     Ok(Response::new(body))
//! }));
//!
//! server
//!     .listen_and_serve(CancellationToken::new(), "0.0.0.0:4433")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod middleware;
pub mod traffic;

pub use self::config::{ServerBuilder, ServerConfig};
pub use self::error::ServerError;
pub use self::handler::{Middleware, StreamHandler, Unary, chain_middleware, middleware_fn, unary};

use crate::context::CallContext;
use tokio_util::task::TaskTracker;
use crate::stream::{QuicStream, Stream};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use quinn::{Connection, Endpoint, VarInt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

type HandlerSlot = ArcSwapOption<Arc<dyn StreamHandler>>;

/// A QUIC server dispatching streams to a hot-swappable handler.
///
/// The server is shared by reference: [`listen_and_serve`] runs until
/// cancelled while [`upgrade`] and [`shutdown`] are called from elsewhere,
/// typically through an `Arc<Server>`.
///
/// [`listen_and_serve`]: Server::listen_and_serve
/// [`upgrade`]: Server::upgrade
/// [`shutdown`]: Server::shutdown
pub struct Server {
    config: ServerConfig,
    middlewares: Vec<Middleware>,
    handler: Arc<HandlerSlot>,
    endpoint: Mutex<Option<Endpoint>>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl Server {
    /// Returns a builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub(crate) fn new(config: ServerConfig, middlewares: Vec<Middleware>) -> Self {
        Self {
            config,
            middlewares,
            handler: Arc::new(ArcSwapOption::empty()),
            endpoint: Mutex::new(None),
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
        }
    }

    /// Wraps `handler` in the middleware chain and installs it.
    ///
    /// The swap is atomic. Safe to call before or during
    /// [`listen_and_serve`](Server::listen_and_serve), from any task.
    pub fn upgrade<H: StreamHandler>(&self, handler: H) {
        let chained = chain_middleware(Arc::new(handler), &self.middlewares);
        self.handler.store(Some(Arc::new(chained)));
        tracing::debug!("Stream handler installed");
    }

    /// Returns `true` once a handler has been installed.
    pub fn has_handler(&self) -> bool {
        self.handler.load().is_some()
    }

    /// The bound address, while [`listen_and_serve`](Server::listen_and_serve)
    /// holds its socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoint
            .lock()
            .as_ref()
            .and_then(|endpoint| endpoint.local_addr().ok())
    }

    /// Binds `address` and serves connections until `token` is cancelled or
    /// [`shutdown`](Server::shutdown) is called.
    ///
    /// Cancelling `token` also ends every connection task started by this
    /// call. [`shutdown`](Server::shutdown) only stops accepting; established
    /// connections keep serving until they close or `token` is cancelled.
    /// The call returns once every connection has ended and the socket has
    /// been released.
    ///
    /// # Errors
    ///
    /// Fails if no TLS configuration was given, if `address` cannot be
    /// resolved, or if the socket cannot be bound. Errors of individual
    /// connections and streams are logged and never end the loop.
    pub async fn listen_and_serve(
        &self,
        token: CancellationToken,
        address: &str,
    ) -> Result<(), ServerError> {
        let tls = self
            .config
            .tls
            .clone()
            .ok_or(ServerError::MissingTlsConfig)?;
        let bind_addr = resolve(address).await?;

        let mut server_config = quinn::ServerConfig::with_crypto(tls);
        server_config.transport_config(Arc::new(self.config.quic.transport_config()));
        server_config.migration(self.config.quic.enable_migration);

        let endpoint =
            Endpoint::server(server_config, bind_addr).map_err(|source| ServerError::BindFailed {
                address: address.to_string(),
                source,
            })?;
        *self.endpoint.lock() = Some(endpoint.clone());
        if self.shutdown.is_cancelled() {
            endpoint.set_server_config(None);
        }

        tracing::info!(
            "QUIC server listening on {}",
            endpoint.local_addr().map_or_else(|_| address.to_string(), |a| a.to_string())
        );

        let connections = TaskTracker::new();
        loop {
            let connecting = tokio::select! {
                _ = token.cancelled() => break,
                _ = self.shutdown.cancelled() => break,
                incoming = endpoint.accept() => match incoming {
                    Some(connecting) => connecting,
                    None => break,
                },
            };

            let handler = Arc::clone(&self.handler);
            let token = token.child_token();
            connections.spawn(async move {
                let connection = tokio::select! {
                    _ = token.cancelled() => return,
                    result = connecting => match result {
                        Ok(connection) => connection,
                        Err(e) => {
                            tracing::debug!("Failed to accept connection: {}", e);
                            return;
                        }
                    },
                };
                serve_connection(connection, handler, token).await;
            });
        }

        tracing::info!("QUIC server stopped accepting connections");
        connections.close();
        connections.wait().await;

        endpoint.close(VarInt::from_u32(0), b"server closed");
        endpoint.wait_idle().await;
        *self.endpoint.lock() = None;
        self.stopped.cancel();

        tracing::info!("QUIC server closed");
        Ok(())
    }

    /// Stops accepting new connections and waits for the server to drain.
    ///
    /// Idempotent. In-flight streams are not interrupted. The call returns
    /// once every established connection has ended and the socket has been
    /// released, or as soon as `ctx` is cancelled, whichever comes first.
    /// Returns immediately if the server is not listening.
    pub async fn shutdown(&self, ctx: CallContext) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            if let Some(endpoint) = self.endpoint.lock().as_ref() {
                endpoint.set_server_config(None);
            }
            tracing::info!("QUIC server shutting down");
        }

        if self.endpoint.lock().is_none() {
            return;
        }
        tokio::select! {
            _ = ctx.token().cancelled() => {
                tracing::debug!("Stopped waiting for QUIC server to drain");
            }
            _ = self.stopped.cancelled() => {}
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("middlewares", &self.middlewares.len())
            .field("has_handler", &self.has_handler())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

async fn serve_connection(
    connection: Connection,
    handler: Arc<HandlerSlot>,
    token: CancellationToken,
) {
    let remote = connection.remote_address();
    tracing::debug!("Accepted connection from {}", remote);

    loop {
        let (send, recv) = tokio::select! {
            _ = token.cancelled() => break,
            accepted = connection.accept_bi() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::debug!("Connection from {} ended: {}", remote, e);
                    break;
                }
            },
        };

        let mut stream = QuicStream::new(send, recv, token.child_token());
        let stream_id = stream.id();

        // Snapshot the handler so a concurrent upgrade never splits a stream.
        let Some(current) = handler.load_full() else {
            tracing::warn!(
                stream_id,
                "No stream handler installed, closing stream from {}",
                remote
            );
            tokio::spawn(async move {
                let _ = stream.shutdown().await;
            });
            continue;
        };

        tokio::spawn(async move {
            let ctx = CallContext::new(stream.cancellation_token().clone());
            // Failures were already logged and mapped by the middleware chain.
            let _ = current.handle_stream(ctx, &mut stream).await;
            let _ = stream.shutdown().await;
        });
    }

    connection.close(VarInt::from_u32(0), b"connection closed");
}

async fn resolve(address: &str) -> Result<SocketAddr, ServerError> {
    let invalid = |reason: String| ServerError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    tokio::net::lookup_host(address)
        .await
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses resolved".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Response;
    use crate::tls;

    #[tokio::test]
    async fn test_missing_tls_config() {
        let server = Server::builder().build();
        let result = server
            .listen_and_serve(CancellationToken::new(), "127.0.0.1:0")
            .await;
        assert!(matches!(result, Err(ServerError::MissingTlsConfig)));
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let server = Server::builder()
            .with_tls_config(tls::self_signed_server_config(vec!["localhost".into()]).unwrap())
            .build();
        let result = server
            .listen_and_serve(CancellationToken::new(), "not an address")
            .await;
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_upgrade_installs_handler() {
        let server = Server::builder().with_default_middlewares(1024).build();
        assert!(!server.has_handler());

        server.upgrade(unary(|_ctx, _request| async move { Ok(Response::default()) }));
        assert!(server.has_handler());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_stops_accept_loop() {
        let server = Arc::new(
            Server::builder()
                .with_tls_config(tls::self_signed_server_config(vec!["localhost".into()]).unwrap())
                .build(),
        );

        let serving = Arc::clone(&server);
        let task = tokio::spawn(async move {
            serving
                .listen_and_serve(CancellationToken::new(), "127.0.0.1:0")
                .await
        });

        while server.local_addr().is_none() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            server.shutdown(CallContext::background()),
        )
        .await
        .unwrap();
        server.shutdown(CallContext::background()).await;

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_before_listening_returns_immediately() {
        let server = Server::builder().build();
        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            server.shutdown(CallContext::background()),
        )
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_token_cancellation_stops_accept_loop() {
        let server = Arc::new(
            Server::builder()
                .with_tls_config(tls::self_signed_server_config(vec!["localhost".into()]).unwrap())
                .build(),
        );
        let token = CancellationToken::new();

        let serving = Arc::clone(&server);
        let serve_token = token.clone();
        let task =
            tokio::spawn(async move { serving.listen_and_serve(serve_token, "127.0.0.1:0").await });

        while server.local_addr().is_none() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let bound = server.local_addr().unwrap();

        token.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(server.local_addr().is_none());

        // The socket is released once serving ends.
        let mut rebound = None;
        for _ in 0..100 {
            if let Ok(socket) = std::net::UdpSocket::bind(bound) {
                rebound = Some(socket);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(rebound.is_some(), "{bound} is still bound");
    }
}
