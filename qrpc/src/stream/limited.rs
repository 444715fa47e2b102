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


//! Read-side byte limit.

use crate::stream::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A stream whose read side fails once more than `limit` bytes arrive.
///
/// Up to `limit` bytes are delivered unchanged. A read that would go past
/// the limit fails with [`io::ErrorKind::InvalidData`] instead of
/// buffering the excess, so an oversized request is rejected without being
/// held in memory. Writes pass through untouched.
pub struct LimitedStream<'a> {
    inner: &'a mut dyn Stream,
    limit: u64,
    remaining: u64,
}

impl<'a> LimitedStream<'a> {
    /// Limits the read side of `inner` to `limit` bytes.
    pub fn new(inner: &'a mut dyn Stream, limit: u64) -> Self {
        Self {
            inner,
            limit,
            remaining: limit,
        }
    }

    /// Bytes that may still be read before the limit is hit.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl AsyncRead for LimitedStream<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.remaining == 0 {
            // Read one more byte to tell a clean end-of-stream apart
            // from an oversized body.
            let mut extra = [0u8; 1];
            let mut extra_buf = ReadBuf::new(&mut extra);
            ready!(Pin::new(&mut *this.inner).poll_read(cx, &mut extra_buf))?;
            if extra_buf.filled().is_empty() {
                return Poll::Ready(Ok(()));
            }
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("request exceeds {} bytes", this.limit),
            )));
        }

        let max = std::cmp::min(buf.remaining() as u64, this.remaining) as usize;
        let dst = buf.initialize_unfilled_to(max);
        let mut limited = ReadBuf::new(dst);
        ready!(Pin::new(&mut *this.inner).poll_read(cx, &mut limited))?;
        let n = limited.filled().len();
        buf.advance(n);
        this.remaining -= n as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for LimitedStream<'_> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_shutdown(cx)
    }
}

impl Stream for LimitedStream<'_> {
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
