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


//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use qrpc::client::{Client, ClientBuilder};
use qrpc::config::QuicConfig;
use qrpc::envelope::Response;
use qrpc::request_id::REQUEST_ID_HEADER;
use qrpc::server::{Server, ServerBuilder, StreamHandler, unary};
use qrpc::tls;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Routes test logs through the test harness. `RUST_LOG` selects levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A running server and the means to stop it.
pub struct TestServer {
    pub server: Arc<Server>,
    pub address: String,
    pub token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Cancels the server and waits until its socket is released.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("Server did not stop")
                .expect("Server task panicked");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A server builder with a self-signed certificate.
pub fn server_builder() -> ServerBuilder {
    Server::builder().with_tls_config(
        tls::self_signed_server_config(vec!["localhost".to_string()])
            .expect("Failed to create TLS config"),
    )
}

/// Starts `server` on an ephemeral port and waits until it is bound.
pub async fn start(server: Server) -> TestServer {
    start_at(server, "127.0.0.1:0").await
}

/// Starts `server` on `address`, retrying while a previous socket on the
/// same port is being released.
pub async fn start_at(server: Server, address: &str) -> TestServer {
    init_tracing();
    tokio::time::timeout(Duration::from_secs(5), async {
        while std::net::UdpSocket::bind(address).is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Address did not become free");

    let server = Arc::new(server);
    let token = CancellationToken::new();

    let serving = Arc::clone(&server);
    let serve_token = token.clone();
    let bind_address = address.to_string();
    let task = tokio::spawn(async move {
        serving
            .listen_and_serve(serve_token, &bind_address)
            .await
            .expect("Server failed");
    });

    let address = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(address) = server.local_addr() {
                return address;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Server did not bind");

    TestServer {
        server,
        address: address.to_string(),
        token,
        task: Some(task),
    }
}

/// Answers `echo: <body>` and returns the request id as a header.
pub fn echo() -> impl StreamHandler {
    unary(|ctx, request| async move {
        let mut body = b"echo: ".to_vec();
        body.extend_from_slice(&request.body);
        let mut response = Response::new(body);
        if let Some(request_id) = ctx.request_id() {
            response = response.with_header(REQUEST_ID_HEADER, request_id.as_str());
        }
        Ok(response)
    })
}

/// Answers with a fixed body.
pub fn fixed(body: &'static str) -> impl StreamHandler {
    unary(move |_ctx, _request| async move { Ok(Response::new(body)) })
}

/// A client builder with short timeouts.
pub fn client_builder() -> ClientBuilder {
    Client::builder().with_dial_timeout(Duration::from_secs(2))
}

/// QUIC settings under which idle connections die quickly.
pub fn short_idle() -> QuicConfig {
    QuicConfig {
        max_idle_timeout: Duration::from_millis(300),
        keep_alive_interval: None,
        ..Default::default()
    }
}
