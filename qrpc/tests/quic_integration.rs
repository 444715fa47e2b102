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


//! End-to-end tests of calls over QUIC.
//!
//! These tests cover:
//! - Basic request/response exchange and request id correlation
//! - Connection reuse and per-address pooling
//! - Hot-swapping the handler while serving
//! - Timeouts, cancellation and stale connection eviction
//! - Server shutdown and client close

mod common;

use common::{client_builder, echo, fixed, server_builder, short_idle, start, start_at};
use qrpc::client::middleware;
use qrpc::context::CallContext;
use qrpc::envelope::Response;
use qrpc::request_id::{REQUEST_ID_HEADER, RequestId};
use qrpc::server::traffic::{LogConfig, log_traffic};
use qrpc::server::unary;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_echo_round_trip() {
    let server = start(
        server_builder()
            .with_middleware(log_traffic(LogConfig::new(true)))
            .with_default_middlewares(1024 * 1024)
            .build(),
    )
    .await;
    server.server.upgrade(echo());

    let client = client_builder().build().expect("Failed to build client");
    let response = client
        .request(&server.address)
        .body("ping")
        .send(CallContext::background())
        .await
        .expect("Call failed");

    assert_eq!(response.body, b"echo: ping");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_body_round_trip() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = client_builder().build().expect("Failed to build client");
    let response = client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call failed");

    assert_eq!(response.body, b"echo: ");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_id_propagates_to_server() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = client_builder()
        .with_middleware(middleware::request_id())
        .build()
        .expect("Failed to build client");

    let ctx = CallContext::background().with_request_id(RequestId::parse("trace-42").unwrap());
    let response = client
        .request(&server.address)
        .send(ctx)
        .await
        .expect("Call failed");
    assert_eq!(response.header(REQUEST_ID_HEADER), Some("trace-42"));

    let response = client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call failed");
    let generated = response.header(REQUEST_ID_HEADER).expect("No request id");
    assert!(!generated.is_empty());
    assert_ne!(generated, "trace-42");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_connection() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = Arc::new(client_builder().build().expect("Failed to build client"));
    client
        .request(&server.address)
        .body("warm up")
        .send(CallContext::background())
        .await
        .expect("Call failed");

    let mut calls = Vec::new();
    for i in 0..32 {
        let client = Arc::clone(&client);
        let address = server.address.clone();
        calls.push(tokio::spawn(async move {
            let response = client
                .request(&address)
                .body(format!("call {}", i))
                .send(CallContext::background())
                .await
                .expect("Call failed");
            assert_eq!(response.body, format!("echo: call {}", i).into_bytes());
        }));
    }
    for call in calls {
        call.await.expect("Task panicked");
    }

    let stats = client.pool_stats();
    assert_eq!(stats.dials, 1);
    assert_eq!(stats.live_connections, 1);
    assert_eq!(stats.evictions, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_connection_per_address() {
    let first = start(server_builder().with_default_middlewares(1024).build()).await;
    first.server.upgrade(fixed("first"));
    let second = start(server_builder().with_default_middlewares(1024).build()).await;
    second.server.upgrade(fixed("second"));

    let client = client_builder().build().expect("Failed to build client");
    for _ in 0..3 {
        for (server, expected) in [(&first, "first"), (&second, "second")] {
            let response = client
                .request(&server.address)
                .send(CallContext::background())
                .await
                .expect("Call failed");
            assert_eq!(response.body, expected.as_bytes());
        }
    }

    let stats = client.pool_stats();
    assert_eq!(stats.dials, 2);
    assert_eq!(stats.live_connections, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_address_override() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(fixed("overridden"));

    let client = client_builder().build().expect("Failed to build client");
    let response = client
        .request("127.0.0.1:1")
        .address(server.address.clone())
        .send(CallContext::background())
        .await
        .expect("Call failed");
    assert_eq!(response.body, b"overridden");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hot_swap_handler() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(fixed("v1"));

    let client = client_builder().build().expect("Failed to build client");
    let call = || {
        client
            .request(&server.address)
            .send(CallContext::background())
    };

    assert_eq!(call().await.expect("Call failed").body, b"v1");
    server.server.upgrade(fixed("v2"));
    assert_eq!(call().await.expect("Call failed").body, b"v2");
    assert_eq!(call().await.expect("Call failed").body, b"v2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hot_swap_keeps_in_flight_stream_on_old_handler() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    {
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        server.server.upgrade(unary(move |_ctx, _request| {
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            async move {
                entered.notify_one();
                release.notified().await;
                Ok(Response::new("old"))
            }
        }));
    }

    let client = Arc::new(client_builder().build().expect("Failed to build client"));
    let in_flight = {
        let client = Arc::clone(&client);
        let address = server.address.clone();
        tokio::spawn(async move {
            client
                .request(&address)
                .send(CallContext::background())
                .await
        })
    };

    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .expect("Old handler never ran");
    server.server.upgrade(fixed("new"));

    let next = client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call after swap failed");
    assert_eq!(next.body, b"new");

    release.notify_one();
    let first = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .expect("In-flight call never finished")
        .expect("Task panicked")
        .expect("In-flight call failed");
    assert_eq!(first.body, b"old");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_headers_and_binary_body_round_trip() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(unary(|_ctx, request| async move {
        Ok(Response {
            body: request.body.clone(),
            headers: request.headers.clone(),
        })
    }));

    let body: Vec<u8> = (0..=255u8).collect();
    let client = client_builder().build().expect("Failed to build client");
    let response = client
        .request(&server.address)
        .header("content-type", "application/octet-stream")
        .header("x-tenant", "acme")
        .header("x-empty", "")
        .header("x-unicode", "grüße ✓")
        .header(REQUEST_ID_HEADER, "fixed-id")
        .body(body.clone())
        .send(CallContext::background())
        .await
        .expect("Call failed");

    assert_eq!(response.body, body);
    let expected: HashMap<String, String> = [
        ("content-type", "application/octet-stream"),
        ("x-tenant", "acme"),
        ("x-empty", ""),
        ("x-unicode", "grüße ✓"),
        (REQUEST_ID_HEADER, "fixed-id"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect();
    assert_eq!(response.headers, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_handler_installed() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;

    let client = client_builder().build().expect("Failed to build client");
    let result = client
        .request(&server.address)
        .timeout(Duration::from_secs(5))
        .send(CallContext::background())
        .await;
    assert!(result.is_err());

    server.server.upgrade(fixed("ready"));
    let response = client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call failed");
    assert_eq!(response.body, b"ready");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_call_timeout() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(unary(|_ctx, _request| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Response::default())
    }));

    let client = client_builder().build().expect("Failed to build client");
    let error = client
        .request(&server.address)
        .timeout(Duration::from_millis(200))
        .send(CallContext::background())
        .await
        .unwrap_err();
    assert!(error.is_timeout(), "unexpected error: {}", error);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_call_cancellation() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(unary(|_ctx, _request| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Response::default())
    }));

    let client = client_builder().build().expect("Failed to build client");
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let error = client
        .request(&server.address)
        .send(CallContext::new(token))
        .await
        .unwrap_err();
    assert!(error.is_cancelled(), "unexpected error: {}", error);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_already_cancelled_context() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = client_builder().build().expect("Failed to build client");
    let ctx = CallContext::background();
    ctx.token().cancel();

    let error = client.request(&server.address).send(ctx).await.unwrap_err();
    assert!(error.is_cancelled());
    assert_eq!(client.pool_stats().dials, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_connection_is_replaced() {
    let server = start(
        server_builder()
            .with_quic_config(short_idle())
            .with_default_middlewares(1024)
            .build(),
    )
    .await;
    server.server.upgrade(echo());

    let client = client_builder()
        .with_quic_config(short_idle())
        .build()
        .expect("Failed to build client");

    let first = client
        .request(&server.address)
        .body("before")
        .send(CallContext::background())
        .await
        .expect("Call failed");
    assert_eq!(first.body, b"echo: before");

    // Let the connection idle out on both sides.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let second = client
        .request(&server.address)
        .body("after")
        .send(CallContext::background())
        .await
        .expect("Call failed");
    assert_eq!(second.body, b"echo: after");

    let stats = client.pool_stats();
    assert_eq!(stats.dials, 2);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.live_connections, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_keeps_established_connections() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = client_builder().build().expect("Failed to build client");
    client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call failed");

    // Shutdown waits for the established connection, so bound it.
    let draining = tokio::time::timeout(
        Duration::from_millis(200),
        server.server.shutdown(CallContext::background()),
    )
    .await;
    assert!(draining.is_err());

    let response = client
        .request(&server.address)
        .body("still here")
        .send(CallContext::background())
        .await
        .expect("Call on established connection failed");
    assert_eq!(response.body, b"echo: still here");

    let newcomer = client_builder()
        .with_dial_timeout(Duration::from_millis(500))
        .build()
        .expect("Failed to build client");
    let result = newcomer
        .request(&server.address)
        .send(CallContext::background())
        .await;
    assert!(result.is_err());

    // Once the last connection ends the server drains and releases its socket.
    client.close();
    tokio::time::timeout(
        Duration::from_secs(5),
        server.server.shutdown(CallContext::background()),
    )
    .await
    .expect("Shutdown did not complete");
    assert!(server.server.local_addr().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_wait_is_bounded_by_context() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = client_builder().build().expect("Failed to build client");
    client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call failed");

    let token = CancellationToken::new();
    let deadline = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        deadline.cancel();
    });
    tokio::time::timeout(
        Duration::from_secs(5),
        server.server.shutdown(CallContext::new(token)),
    )
    .await
    .expect("Shutdown ignored its context");

    // The connection is still open, so the server is still bound.
    assert!(server.server.local_addr().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_server_releases_its_address() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(fixed("first"));
    let address = server.address.clone();

    let client = client_builder().build().expect("Failed to build client");
    client
        .request(&address)
        .send(CallContext::background())
        .await
        .expect("Call failed");

    let first = Arc::clone(&server.server);
    server.stop().await;
    assert!(first.local_addr().is_none());

    let replacement = start_at(server_builder().with_default_middlewares(1024).build(), &address).await;
    replacement.server.upgrade(fixed("second"));
    assert_eq!(replacement.address, address);

    let fresh = client_builder().build().expect("Failed to build client");
    let response = fresh
        .request(&address)
        .send(CallContext::background())
        .await
        .expect("Call to replacement server failed");
    assert_eq!(response.body, b"second");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connection_closed_by_server_is_replaced() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(fixed("first"));
    let address = server.address.clone();

    let client = client_builder().build().expect("Failed to build client");
    let first = client
        .request(&address)
        .send(CallContext::background())
        .await
        .expect("Call failed");
    assert_eq!(first.body, b"first");

    server.stop().await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.pool_stats().live_connections > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Client never observed the close");

    let replacement = start_at(server_builder().with_default_middlewares(1024).build(), &address).await;
    replacement.server.upgrade(fixed("second"));

    let second = client
        .request(&address)
        .send(CallContext::background())
        .await
        .expect("Call after server restart failed");
    assert_eq!(second.body, b"second");

    let stats = client.pool_stats();
    assert_eq!(stats.dials, 2);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.live_connections, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_closed_client_fails_calls() {
    let server = start(server_builder().with_default_middlewares(1024).build()).await;
    server.server.upgrade(echo());

    let client = client_builder().build().expect("Failed to build client");
    client
        .request(&server.address)
        .send(CallContext::background())
        .await
        .expect("Call failed");

    client.close();
    assert_eq!(client.pool_stats().live_connections, 0);

    let result = client
        .request(&server.address)
        .send(CallContext::background())
        .await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dial_to_unreachable_address_fails() {
    let client = client_builder()
        .with_dial_timeout(Duration::from_millis(300))
        .build()
        .expect("Failed to build client");

    // Nothing listens here; the handshake never completes.
    let error = client
        .request("127.0.0.1:9")
        .send(CallContext::background())
        .await
        .unwrap_err();
    assert!(error.stream_error_code().is_none());
    assert_eq!(client.pool_stats().dials, 0);
}
