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


//! Traffic capture.

use crate::stream::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A stream that copies everything read and written into side buffers.
///
/// The bytes seen by the wrapped stream's user and by the peer are not
/// altered.
pub struct TeeStream<'a> {
    inner: &'a mut dyn Stream,
    read: Vec<u8>,
    written: Vec<u8>,
}

impl<'a> TeeStream<'a> {
    /// Starts capturing traffic of `inner`.
    pub fn new(inner: &'a mut dyn Stream) -> Self {
        Self {
            inner,
            read: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Bytes read through this stream so far.
    pub fn read_bytes(&self) -> &[u8] {
        &self.read
    }

    /// Bytes accepted for writing through this stream so far.
    pub fn written_bytes(&self) -> &[u8] {
        &self.written
    }
}

impl AsyncRead for TeeStream<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut *this.inner).poll_read(cx, buf))?;
        this.read.extend_from_slice(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for TeeStream<'_> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let n = ready!(Pin::new(&mut *this.inner).poll_write(cx, buf))?;
        this.written.extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_shutdown(cx)
    }
}

impl Stream for TeeStream<'_> {
    fn id(&self) -> u64 {
        self.inner.id()
    }

    fn cancel_write(&mut self, error_code: u64) {
        self.inner.cancel_write(error_code);
    }

    fn cancel_read(&mut self, error_code: u64) {
        self.inner.cancel_read(error_code);
    }

    fn cancellation_token(&self) -> &CancellationToken {
        self.inner.cancellation_token()
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.inner.set_read_deadline(deadline);
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.inner.set_write_deadline(deadline);
    }
}
