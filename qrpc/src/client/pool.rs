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


//! Connection pool keyed by destination address.

use crate::client::ClientError;
use parking_lot::Mutex;
use quinn::{Connection, Endpoint, VarInt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters describing the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Pooled connections that have not been observed closed.
    pub live_connections: usize,
    /// Connections successfully established since the client was built.
    pub dials: u64,
    /// Closed connections removed from the pool.
    pub evictions: u64,
}

/// At most one live connection per address.
///
/// Staleness is detected lazily: a pooled connection whose close reason is
/// set is evicted the next time its address is requested. The lock is
/// never held across a dial, so two callers may race to dial the same
/// address; the loser closes its connection and adopts the winner's.
pub(crate) struct ConnectionPool {
    endpoint: Endpoint,
    client_config: quinn::ClientConfig,
    dial_timeout: Duration,
    connections: Mutex<HashMap<String, Connection>>,
    dials: AtomicU64,
    evictions: AtomicU64,
}

impl ConnectionPool {
    pub(crate) fn new(
        endpoint: Endpoint,
        client_config: quinn::ClientConfig,
        dial_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            client_config,
            dial_timeout,
            connections: Mutex::new(HashMap::new()),
            dials: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the live connection for `address`, dialing one if needed.
    pub(crate) async fn get(&self, address: &str) -> Result<Connection, ClientError> {
        if let Some(connection) = self.lookup(address) {
            return Ok(connection);
        }

        let connection = self.dial(address).await?;

        let mut connections = self.connections.lock();
        if let Some(existing) = connections.get(address) {
            if existing.close_reason().is_none() {
                tracing::debug!("Lost dial race for {}, reusing pooled connection", address);
                connection.close(VarInt::from_u32(0), b"duplicate connection");
                return Ok(existing.clone());
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        connections.insert(address.to_string(), connection.clone());
        Ok(connection)
    }

    fn lookup(&self, address: &str) -> Option<Connection> {
        let mut connections = self.connections.lock();
        let stale = match connections.get(address) {
            Some(connection) if connection.close_reason().is_none() => {
                return Some(connection.clone());
            }
            Some(_) => true,
            None => false,
        };
        if stale {
            connections.remove(address);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Evicted closed connection to {}", address);
        }
        None
    }

    async fn dial(&self, address: &str) -> Result<Connection, ClientError> {
        let remote = self.resolve(address).await?;
        let connecting =
            self.endpoint
                .connect_with(self.client_config.clone(), remote, server_name(address))?;

        let connection = tokio::time::timeout(self.dial_timeout, connecting)
            .await
            .map_err(|_| ClientError::DialTimeout {
                address: address.to_string(),
                timeout: self.dial_timeout,
            })??;

        self.dials.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Connected to {} at {}", address, remote);
        Ok(connection)
    }

    async fn resolve(&self, address: &str) -> Result<SocketAddr, ClientError> {
        let invalid = |reason: String| ClientError::InvalidAddress {
            address: address.to_string(),
            reason,
        };
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(address)
            .await
            .map_err(|e| invalid(e.to_string()))?
            .collect();

        // The endpoint socket is bound to a single address family.
        let local_v4 = self
            .endpoint
            .local_addr()
            .map(|local| local.is_ipv4())
            .unwrap_or(true);
        candidates
            .iter()
            .find(|candidate| candidate.is_ipv4() == local_v4)
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| invalid("no addresses resolved".to_string()))
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let live_connections = self
            .connections
            .lock()
            .values()
            .filter(|connection| connection.close_reason().is_none())
            .count();
        PoolStats {
            live_connections,
            dials: self.dials.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Closes every pooled connection and the endpoint.
    pub(crate) fn close(&self) {
        let connections: Vec<Connection> = self
            .connections
            .lock()
            .drain()
            .map(|(_, connection)| connection)
            .collect();
        for connection in connections {
            connection.close(VarInt::from_u32(0), b"client closed");
        }
        self.endpoint.close(VarInt::from_u32(0), b"client closed");
    }
}

/// Host part of `address`, used as the TLS server name.
fn server_name(address: &str) -> &str {
    let host = match address.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => address,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}
