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


//! QUIC echo client.
//!
//! Sends a few calls to the echo server. Start the server first:
//! ```bash
//! cargo run --example echo_server
//! ```

use qrpc::client::{Client, middleware};
use qrpc::context::CallContext;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let client = Client::builder()
        .with_middleware(middleware::request_id())
        .build()?;

    for message in ["Hello, QUIC!", "ping", "How are you?"] {
        let result = client
            .request("127.0.0.1:4433")
            .timeout(Duration::from_secs(3))
            .body(message)
            .send(CallContext::background())
            .await;
        match result {
            Ok(response) => println!("{}", String::from_utf8_lossy(&response.body)),
            Err(e) => match e.stream_error_code() {
                Some(code) => eprintln!("Server rejected '{}' with code {}", message, code),
                None => eprintln!("Call '{}' failed: {}", message, e),
            },
        }
    }

    let stats = client.pool_stats();
    println!(
        "{} connection(s) dialed, {} live",
        stats.dials, stats.live_connections
    );
    client.close();
    Ok(())
}
