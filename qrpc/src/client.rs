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


//! QUIC client.
//!
//! A [`Client`] keeps at most one live connection per destination address
//! and opens a fresh bidirectional stream for every call. A call writes the
//! request envelope, half-closes, reads the response to end-of-stream and
//! decodes it.
//!
//! Calls pass through the client's middleware chain before reaching the
//! physical layer. A server-side handler error arrives as a stream reset;
//! [`ClientError::stream_error_code`] recovers its wire code.
//!
//! # Examples
//!
//! ```rust,no_run
//! use qrpc::client::{Client, middleware};
//! use qrpc::context::CallContext;
//!
//! # async fn example() -> Result<(), qrpc::client::ClientError> {
//! let client = Client::builder()
//!     .with_middleware(middleware::request_id())
//!     .build()?;
//!
//! match client
//!     .request("127.0.0.1:4433")
//!     .body("ping")
//!     .send(CallContext::background())
//!     .await
//! {
//!     Ok(response) => println!("{}", String::from_utf8_lossy(&response.body)),
//!     Err(e) => match e.stream_error_code() {
//!         Some(code) => eprintln!("server rejected the call with code {code}"),
//!         None => eprintln!("call failed: {e}"),
//!     },
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod error;
pub mod middleware;
mod pool;
mod round_trip;

pub use self::builder::RequestBuilder;
pub use self::config::{ClientBuilder, ClientConfig};
pub use self::error::ClientError;
pub use self::pool::PoolStats;
pub use self::round_trip::{Middleware, RoundTripper, RoundTripperFn, middleware_fn, round_tripper_fn};

use crate::context::CallContext;
use crate::envelope::{Request, Response};
use crate::stream::{QuicStream, Stream};
use async_trait::async_trait;
use quinn::Endpoint;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// A pooled QUIC client.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and calls may
/// run concurrently.
pub struct Client {
    config: ClientConfig,
    pool: Arc<pool::ConnectionPool>,
    tripper: Arc<dyn RoundTripper>,
}

impl Client {
    /// Returns a builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        config: ClientConfig,
        middlewares: Vec<Middleware>,
    ) -> Result<Self, ClientError> {
        let endpoint = Endpoint::client(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
            .map_err(ClientError::Endpoint)?;

        let mut client_config = quinn::ClientConfig::new(config.tls.clone());
        client_config.transport_config(Arc::new(config.quic.transport_config()));

        let pool = Arc::new(pool::ConnectionPool::new(
            endpoint,
            client_config,
            config.dial_timeout,
        ));
        let physical: Arc<dyn RoundTripper> = Arc::new(QuicRoundTripper {
            pool: Arc::clone(&pool),
            read_buffer_size: config.read_buffer_size,
        });

        Ok(Self {
            tripper: round_trip::chain(physical, &middlewares),
            config,
            pool,
        })
    }

    /// Starts a request to `address`.
    pub fn request(&self, address: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, address)
    }

    /// Sends a prepared request through the middleware chain.
    ///
    /// The call is bounded by the request's timeout, when set and non-zero,
    /// and abandoned as soon as `ctx` is cancelled. An abandoned call resets
    /// its stream.
    pub async fn send(&self, ctx: CallContext, request: Request) -> Result<Response, ClientError> {
        let timeout = request.timeout.filter(|timeout| !timeout.is_zero());
        let call_ctx = ctx.child();
        let call = async {
            let round_trip = self.tripper.round_trip(call_ctx, request);
            match timeout {
                Some(timeout) => match tokio::time::timeout(timeout, round_trip).await {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::Timeout(timeout)),
                },
                None => round_trip.await,
            }
        };

        tokio::select! {
            biased;
            _ = ctx.token().cancelled() => Err(ClientError::Cancelled),
            result = call => result,
        }
    }

    /// Returns the effective configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns connection pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Closes every pooled connection and the local endpoint.
    ///
    /// Calls in flight fail; later calls fail to dial.
    pub fn close(&self) {
        self.pool.close();
        tracing::debug!("QUIC client closed");
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("pool", &self.pool.stats())
            .finish()
    }
}

/// The physical layer: one stream per call on a pooled connection.
struct QuicRoundTripper {
    pool: Arc<pool::ConnectionPool>,
    read_buffer_size: usize,
}

#[async_trait]
impl RoundTripper for QuicRoundTripper {
    async fn round_trip(
        &self,
        ctx: CallContext,
        request: Request,
    ) -> Result<Response, ClientError> {
        let connection = self.pool.get(&request.address).await?;
        let (send, recv) = connection.open_bi().await?;
        let mut stream = QuicStream::new(send, recv, ctx.token().child_token());
        tracing::trace!(
            stream_id = stream.id(),
            "Sending {} body bytes to {}",
            request.body.len(),
            request.address
        );

        if let Err(write_error) = request.write(&mut stream).await {
            // A peer that rejects the request stops our side and resets its
            // own; the reset carries the code worth reporting.
            return Err(match read_to_end(&mut stream, self.read_buffer_size).await {
                Err(reset) if error::stream_error_code(&reset).is_some() => ClientError::Io(reset),
                _ => write_error.into(),
            });
        }

        let bytes = read_to_end(&mut stream, self.read_buffer_size).await?;
        Ok(Response::from_slice(&bytes)?)
    }
}

async fn read_to_end(stream: &mut QuicStream, chunk_size: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(bytes);
        }
        bytes.extend_from_slice(&chunk[..n]);
    }
}
