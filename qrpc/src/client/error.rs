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


use crate::envelope::EnvelopeError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`Client`](crate::client::Client).
///
/// Failures are surfaced as they occurred; the client never retries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The destination address could not be resolved.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The address as given
        address: String,
        /// Why resolution failed
        reason: String,
    },

    /// The local QUIC endpoint could not be created.
    #[error("failed to create client endpoint: {0}")]
    Endpoint(#[source] io::Error),

    /// The connection attempt could not be started.
    #[error("failed to connect: {0}")]
    Connect(#[from] quinn::ConnectError),

    /// The connection failed or was lost.
    #[error("connection failed: {0}")]
    Connection(#[from] quinn::ConnectionError),

    /// The handshake did not complete within the dial timeout.
    #[error("timed out dialing {address} after {timeout:?}")]
    DialTimeout {
        /// The address being dialed
        address: String,
        /// The configured dial timeout
        timeout: Duration,
    },

    /// The call did not complete within its timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The call was cancelled through its context.
    #[error("request cancelled")]
    Cancelled,

    /// Reading or writing the stream failed.
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The request could not be sent or the response could not be decoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl ClientError {
    /// Returns `true` if the call or the dial timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::DialTimeout { .. })
            || matches!(self, Self::Connection(quinn::ConnectionError::TimedOut))
    }

    /// Returns `true` if the call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the code the server reset or stopped the stream with.
    ///
    /// A handler error surfaces as a stream reset carrying the error's wire
    /// code; this recovers it. `None` for failures that did not come from
    /// the peer's stream.
    pub fn stream_error_code(&self) -> Option<u64> {
        let source = match self {
            Self::Io(source) => source,
            Self::Envelope(EnvelopeError::Read { source } | EnvelopeError::Write { source }) => {
                source
            }
            _ => return None,
        };
        stream_error_code(source)
    }
}

pub(crate) fn stream_error_code(error: &io::Error) -> Option<u64> {
    let inner = error.get_ref()?;
    if let Some(quinn::ReadError::Reset(code)) = inner.downcast_ref::<quinn::ReadError>() {
        return Some(code.into_inner());
    }
    if let Some(quinn::WriteError::Stopped(code)) = inner.downcast_ref::<quinn::WriteError>() {
        return Some(code.into_inner());
    }
    None
}
