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


//! QUIC echo server.
//!
//! Answers every call with `echo: <body>`. Run with:
//! ```bash
//! cargo run --example echo_server
//! ```
//!
//! In another terminal, run the client:
//! ```bash
//! cargo run --example echo_client
//! ```

use qrpc::config::DEFAULT_MAX_REQUEST_BODY_SIZE;
use qrpc::envelope::Response;
use qrpc::server::traffic::{LogConfig, log_traffic};
use qrpc::server::{Server, unary};
use qrpc::tls;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let server = Arc::new(
        Server::builder()
            .with_tls_config(tls::self_signed_server_config(vec!["localhost".into()])?)
            .with_middleware(log_traffic(LogConfig::new(true)))
            .with_default_middlewares(DEFAULT_MAX_REQUEST_BODY_SIZE)
            .build(),
    );

    server.upgrade(unary(|ctx, request| async move {
        tracing::info!(
            "Echoing {} bytes for request {}",
            request.body.len(),
            ctx.request_id().map(|id| id.as_str()).unwrap_or("-")
        );
        let mut body = b"echo: ".to_vec();
        body.extend_from_slice(&request.body);
        Ok(Response::new(body))
    }));

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!("Press Ctrl+C to stop");
    server.listen_and_serve(token, "127.0.0.1:4433").await?;
    Ok(())
}
