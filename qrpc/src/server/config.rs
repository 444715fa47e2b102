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


//! Server configuration and builder.

use crate::config::QuicConfig;
use crate::server::Server;
use crate::server::handler::Middleware;
use crate::server::middleware::default_middlewares;
use std::sync::Arc;

/// Configuration of a [`Server`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// TLS configuration. Required; its ALPN protocols are used as given.
    pub tls: Option<Arc<rustls::ServerConfig>>,
    /// QUIC transport settings.
    pub quic: QuicConfig,
}

/// Builder for [`Server`].
///
/// # Examples
///
/// ```rust
/// use qrpc::config::DEFAULT_MAX_REQUEST_BODY_SIZE;
/// use qrpc::server::Server;
/// use qrpc::tls;
///
/// let server = Server::builder()
///     .with_tls_config(tls::self_signed_server_config(vec!["localhost".into()]).unwrap())
///     .with_default_middlewares(DEFAULT_MAX_REQUEST_BODY_SIZE)
///     .build();
/// ```
#[derive(Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    middlewares: Vec<Middleware>,
}

impl ServerBuilder {
    /// Creates a builder with no TLS configuration and no middleware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the TLS configuration.
    pub fn with_tls_config(mut self, tls: Arc<rustls::ServerConfig>) -> Self {
        self.config.tls = Some(tls);
        self
    }

    /// Sets the QUIC transport settings.
    pub fn with_quic_config(mut self, quic: QuicConfig) -> Self {
        self.config.quic = quic;
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

    /// Appends the [default chain](default_middlewares).
    pub fn with_default_middlewares(self, max_body_bytes: u64) -> Self {
        self.with_middlewares(default_middlewares(max_body_bytes))
    }

    /// Builds the server. No handler is installed yet; see
    /// [`Server::upgrade`].
    pub fn build(self) -> Server {
        Server::new(self.config, self.middlewares)
    }
}
