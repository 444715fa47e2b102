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

//! Bidirectional byte streams.
//!
//! A [`Stream`] is one request/response exchange: the peer that opened it
//! writes a request and half-closes its write side, the other peer reads to
//! end-of-stream, writes a response and half-closes in turn. Failure is
//! signalled out of band by resetting the write side with a numeric code
//! ([`Stream::cancel_write`]).
//!
//! Reading and writing go through [`AsyncRead`] and [`AsyncWrite`];
//! `AsyncWriteExt::shutdown` is the normal half-close. Middleware wraps a
//! stream to observe or restrict its traffic:
//!
//! - [`QuicStream`]: a quinn send/receive pair
//! - [`LimitedStream`]: fails reads past a byte limit
//! - [`TeeStream`]: copies traffic into side buffers
//! - [`MemoryStream`]: an in-memory stream for tests

mod limited;
mod memory;
mod quic;
mod tee;

pub use self::limited::LimitedStream;
pub use self::memory::MemoryStream;
pub use self::quic::QuicStream;
pub use self::tee::TeeStream;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One bidirectional stream of a connection.
///
/// A stream is owned by a single task and is never reused after its
/// exchange completes.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin {
    /// Stream index, unique within its connection.
    fn id(&self) -> u64;

    /// Abruptly terminates the write side, signalling `error_code` to the
    /// peer. Data not yet delivered is discarded.
    fn cancel_write(&mut self, error_code: u64);

    /// Asks the peer to stop sending, signalling `error_code`.
    fn cancel_read(&mut self, error_code: u64);

    /// Token cancelled when the stream's scope ends.
    fn cancellation_token(&self) -> &CancellationToken;

    /// Sets the instant after which pending and future reads fail with
    /// `TimedOut`. `None` clears the deadline.
    fn set_read_deadline(&mut self, deadline: Option<Instant>);

    /// Sets the instant after which pending and future writes fail with
    /// `TimedOut`. `None` clears the deadline.
    fn set_write_deadline(&mut self, deadline: Option<Instant>);

    /// Sets both deadlines.
    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }
}
