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


//! In-memory stream for testing handlers and middleware.

use crate::stream::Stream;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

static STREAM_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A stream over in-memory buffers.
///
/// Reads drain a fixed input buffer and then report end-of-stream; writes
/// append to an output buffer. Cancellations and the half-close are
/// recorded so tests can assert on them. Deadlines are recorded but never
/// fire since no operation ever blocks.
///
/// # Examples
///
/// ```rust
/// use qrpc::stream::{MemoryStream, Stream};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> std::io::Result<()> {
/// let mut stream = MemoryStream::new(b"ping".to_vec());
///
/// let mut request = Vec::new();
/// stream.read_to_end(&mut request).await?;
/// stream.write_all(b"pong").await?;
/// stream.shutdown().await?;
///
/// assert_eq!(stream.written(), b"pong");
/// assert!(stream.is_write_closed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStream {
    id: u64,
    input: Vec<u8>,
    position: usize,
    output: Vec<u8>,
    write_closed: bool,
    write_cancelled: Option<u64>,
    read_cancelled: Option<u64>,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
    token: CancellationToken,
}

impl MemoryStream {
    /// Creates a stream whose read side yields `input`.
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            id: STREAM_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            input,
            position: 0,
            output: Vec::new(),
            write_closed: false,
            write_cancelled: None,
            read_cancelled: None,
            read_deadline: None,
            write_deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.output
    }

    /// Returns `true` once the write side has been shut down.
    pub fn is_write_closed(&self) -> bool {
        self.write_closed
    }

    /// Code passed to [`Stream::cancel_write`], if it was called.
    pub fn write_cancelled(&self) -> Option<u64> {
        self.write_cancelled
    }

    /// Code passed to [`Stream::cancel_read`], if it was called.
    pub fn read_cancelled(&self) -> Option<u64> {
        self.read_cancelled
    }

    /// The current read deadline.
    pub fn read_deadline(&self) -> Option<Instant> {
        self.read_deadline
    }

    /// The current write deadline.
    pub fn write_deadline(&self) -> Option<Instant> {
        self.write_deadline
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.write_cancelled.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream write side was reset",
            ));
        }
        if self.write_closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream write side is closed",
            ));
        }
        Ok(())
    }
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(code) = this.read_cancelled {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                format!("stream read side stopped with code {}", code),
            )));
        }
        let available = &this.input[this.position..];
        let n = std::cmp::min(available.len(), buf.remaining());
        buf.put_slice(&available[..n]);
        this.position += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MemoryStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.check_writable()?;
        this.output.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.write_cancelled.is_some() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream write side was reset",
            )));
        }
        this.write_closed = true;
        Poll::Ready(Ok(()))
    }
}

impl Stream for MemoryStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn cancel_write(&mut self, error_code: u64) {
        if self.write_cancelled.is_none() && !self.write_closed {
            self.write_cancelled = Some(error_code);
        }
    }

    fn cancel_read(&mut self, error_code: u64) {
        self.read_cancelled.get_or_insert(error_code);
    }

    fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline = deadline;
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.write_deadline = deadline;
    }
}
