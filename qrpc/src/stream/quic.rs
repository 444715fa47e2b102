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


//! QUIC stream backed by quinn.

use crate::stream::Stream;
use quinn::{RecvStream, SendStream, VarInt};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};
use tokio_util::sync::CancellationToken;

/// A bidirectional quinn stream.
///
/// The cancellation token is cancelled when the stream is dropped, so work
/// scoped to the stream can observe its end.
pub struct QuicStream {
    id: u64,
    send: SendStream,
    recv: RecvStream,
    token: CancellationToken,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
    write_closed: bool,
}

impl QuicStream {
    /// Wraps a send/receive pair obtained from `open_bi` or `accept_bi`.
    pub fn new(send: SendStream, recv: RecvStream, token: CancellationToken) -> Self {
        Self {
            id: send.id().index(),
            send,
            recv,
            token,
            read_deadline: None,
            write_deadline: None,
            write_closed: false,
        }
    }
}

fn to_var_int(error_code: u64) -> VarInt {
    VarInt::from_u64(error_code).unwrap_or(VarInt::MAX)
}

fn poll_deadline(deadline: &mut Option<Pin<Box<Sleep>>>, cx: &mut Context<'_>) -> io::Result<()> {
    if let Some(sleep) = deadline.as_mut() {
        if sleep.deadline() <= Instant::now() || sleep.as_mut().poll(cx).is_ready() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "stream deadline exceeded",
            ));
        }
    }
    Ok(())
}

impl Stream for QuicStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn cancel_write(&mut self, error_code: u64) {
        if self.write_closed {
            return;
        }
        self.write_closed = true;
        // Fails only if the peer already stopped the stream.
        let _ = self.send.reset(to_var_int(error_code));
    }

    fn cancel_read(&mut self, error_code: u64) {
        let _ = self.recv.stop(to_var_int(error_code));
    }

    fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline = deadline.map(|at| Box::pin(tokio::time::sleep_until(at)));
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.write_deadline = deadline.map(|at| Box::pin(tokio::time::sleep_until(at)));
    }
}

impl AsyncRead for QuicStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Err(e) = poll_deadline(&mut this.read_deadline, cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.recv).poll_read(cx, buf)
    }
}

impl AsyncWrite for QuicStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Err(e) = poll_deadline(&mut this.write_deadline, cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.send).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().send).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        // Finishing twice, or finishing a reset stream, is a no-op.
        if this.write_closed {
            return Poll::Ready(Ok(()));
        }
        if let Err(e) = poll_deadline(&mut this.write_deadline, cx) {
            return Poll::Ready(Err(e));
        }
        let result = ready!(Pin::new(&mut this.send).poll_shutdown(cx));
        this.write_closed = true;
        Poll::Ready(result)
    }
}

impl Drop for QuicStream {
    fn drop(&mut self) {
        // quinn finishes an unfinished send stream on drop; an abandoned
        // exchange must look aborted to the peer instead.
        if !self.write_closed {
            let _ = self.send.reset(VarInt::from_u32(0));
        }
        self.token.cancel();
    }
}

impl std::fmt::Debug for QuicStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuicStream")
            .field("id", &self.id)
            .field("write_closed", &self.write_closed)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
