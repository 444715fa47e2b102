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

//! QUIC protocol tuning shared by servers and clients.

use std::time::Duration;

/// Default maximum size of a request envelope accepted by the server (64 MiB).
pub const DEFAULT_MAX_REQUEST_BODY_SIZE: u64 = 64 * 1024 * 1024;

/// Default timeout for establishing a client connection.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default chunk size used by the client when reading a response.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Default ALPN protocol identifier.
pub const DEFAULT_ALPN: &[u8] = b"qrpc";

/// Low-level QUIC transport parameters.
///
/// These map directly onto [`quinn::TransportConfig`]. Flow control,
/// congestion control and encryption are left to quinn.
///
/// # Examples
///
/// ```rust
/// use qrpc::config::QuicConfig;
/// use std::time::Duration;
///
/// let config = QuicConfig {
///     max_concurrent_bidi_streams: 1000,
///     keep_alive_interval: None,
///     ..Default::default()
/// };
/// assert_eq!(config.max_idle_timeout, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct QuicConfig {
    /// Maximum idle timeout before a connection is closed.
    ///
    /// The effective value is the minimum of both peers' settings.
    pub max_idle_timeout: Duration,

    /// Interval for sending keep-alive packets, or `None` to disable them.
    ///
    /// Keep-alives stop pooled client connections from idling out between
    /// calls.
    pub keep_alive_interval: Option<Duration>,

    /// Maximum number of concurrent incoming bidirectional streams, i.e. the
    /// number of requests a peer may have in flight on one connection.
    pub max_concurrent_bidi_streams: u32,

    /// Per-stream receive window in bytes.
    pub stream_receive_window: u32,

    /// Initial UDP payload size in bytes.
    ///
    /// 1200 is the QUIC minimum and is safe on every network.
    pub initial_mtu: u16,

    /// Allow clients to migrate to a new address (server only).
    pub enable_migration: bool,
}

impl Default for QuicConfig {
    fn default() -> Self {
        Self {
            max_idle_timeout: Duration::from_secs(60),
            keep_alive_interval: Some(Duration::from_secs(15)),
            max_concurrent_bidi_streams: 100,
            stream_receive_window: 1024 * 1024, // 1 MB
            initial_mtu: 1200,
            enable_migration: true,
        }
    }
}

impl QuicConfig {
    /// Builds the quinn transport configuration.
    pub fn transport_config(&self) -> quinn::TransportConfig {
        let mut transport = quinn::TransportConfig::default();
        transport.max_idle_timeout(Some(
            self.max_idle_timeout
                .try_into()
                .unwrap_or_else(|_| quinn::IdleTimeout::from(quinn::VarInt::from_u32(60_000))),
        ));
        transport.keep_alive_interval(self.keep_alive_interval);
        transport.max_concurrent_bidi_streams(quinn::VarInt::from_u32(
            self.max_concurrent_bidi_streams,
        ));
        // Requests only ever use bidirectional streams.
        transport.max_concurrent_uni_streams(quinn::VarInt::from_u32(0));
        transport.stream_receive_window(quinn::VarInt::from_u32(self.stream_receive_window));
        transport.initial_mtu(self.initial_mtu);
        transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QuicConfig::default();
        assert_eq!(config.max_concurrent_bidi_streams, 100);
        assert_eq!(config.keep_alive_interval, Some(Duration::from_secs(15)));
        assert_eq!(DEFAULT_MAX_REQUEST_BODY_SIZE, 67_108_864);
        assert_eq!(DEFAULT_DIAL_TIMEOUT, Duration::from_secs(5));
        assert_eq!(DEFAULT_READ_BUFFER_SIZE, 4096);
    }

    #[test]
    fn test_transport_config_builds_with_extreme_values() {
        let config = QuicConfig {
            max_idle_timeout: Duration::MAX,
            keep_alive_interval: None,
            ..Default::default()
        };
        let _ = config.transport_config();
    }
}
