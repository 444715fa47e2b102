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


//! Client configuration and builder.

use crate::client::Client;
use crate::client::ClientError;
use crate::client::round_trip::Middleware;
use crate::config::{DEFAULT_DIAL_TIMEOUT, DEFAULT_READ_BUFFER_SIZE, QuicConfig};
use crate::tls;
use std::sync::Arc;
use std::time::Duration;

/// Configuration of a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TLS configuration. Defaults to
    /// [`insecure_client_config`](tls::insecure_client_config).
    pub tls: Arc<rustls::ClientConfig>,
    /// QUIC transport settings.
    pub quic: QuicConfig,
    /// Upper bound on establishing a new connection.
    pub dial_timeout: Duration,
    /// Chunk size used when reading a response.
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tls: tls::insecure_client_config(),
            quic: QuicConfig::default(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// Builder for [`Client`].
///
/// # Examples
///
/// ```rust,no_run
/// use qrpc::client::{Client, middleware};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), qrpc::client::ClientError> {
/// let client = Client::builder()
///     .with_dial_timeout(Duration::from_secs(2))
///     .with_middleware(middleware::request_id())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    middlewares: Vec<Middleware>,
}

impl ClientBuilder {
    /// Creates a builder with the default configuration and no middleware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the TLS configuration.
    pub fn with_tls_config(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.config.tls = tls;
        self
    }

    /// Sets the QUIC transport settings.
    pub fn with_quic_config(mut self, quic: QuicConfig) -> Self {
        self.config.quic = quic;
        self
    }

    /// Sets the dial timeout. Zero falls back to the default.
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.config.dial_timeout = timeout;
        self
    }

    /// Sets the response read chunk size. Zero falls back to the default.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Appends one middleware. Earlier middleware wraps later middleware.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Appends several middlewares in order.
    pub fn with_middlewares<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Middleware>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    /// Creates the client and its local UDP endpoint.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the local endpoint cannot be bound.
    pub fn build(mut self) -> Result<Client, ClientError> {
        if self.config.dial_timeout.is_zero() {
            self.config.dial_timeout = DEFAULT_DIAL_TIMEOUT;
        }
        if self.config.read_buffer_size == 0 {
            self.config.read_buffer_size = DEFAULT_READ_BUFFER_SIZE;
        }
        Client::new(self.config, self.middlewares)
    }
}
