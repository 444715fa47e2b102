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


//! Standard server middleware.
//!
//! [`default_middlewares`] assembles the usual chain. Outermost first:
//!
//! 1. [`error_handler`] logs a failed handler and resets the stream with its
//!    wire code
//! 2. [`max_request_body_size`] bounds how many request bytes are read and
//!    sets the body limit
//! 3. [`decode_request`] decodes the request envelope into the context and
//!    enforces the body limit
//! 4. [`request_id`] attaches a request id and opens a tracing span
//! 5. [`recovery`] turns a panicking handler into an error
//!
//! Recovery sits innermost so that a panic becomes an ordinary error the
//! error handler can map to [`INTERNAL_ERROR_CODE`](crate::error::INTERNAL_ERROR_CODE).

use crate::context::CallContext;
use crate::envelope::{EnvelopeError, Request, max_envelope_size};
use crate::error::{HandlerError, RecoveredPanic};
use crate::request_id::{REQUEST_ID_HEADER, RequestId};
use crate::server::handler::{Middleware, StreamHandler, middleware_fn};
use crate::stream::{LimitedStream, Stream};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, Level};

/// Returns the default chain, with requests limited to `max_body_bytes`.
pub fn default_middlewares(max_body_bytes: u64) -> Vec<Middleware> {
    vec![
        error_handler(),
        max_request_body_size(max_body_bytes),
        decode_request(),
        request_id(),
        recovery(),
    ]
}

/// Converts a panic in the wrapped handler into a [`RecoveredPanic`] error.
///
/// The backtrace is captured where the panic is caught, not where it was
/// raised.
pub fn recovery() -> Middleware {
    middleware_fn(|next| Arc::new(Recovery { next }))
}

struct Recovery {
    next: Arc<dyn StreamHandler>,
}

#[async_trait]
impl StreamHandler for Recovery {
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        match AssertUnwindSafe(self.next.handle_stream(ctx, stream))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(RecoveredPanic::from_payload(payload).into()),
        }
    }
}

/// Logs a failed handler and resets the stream's write side with the
/// error's wire code.
///
/// The log level comes from the error's classification, `ERROR` when it has
/// none. Errors without a wire code are reported to the peer as
/// [`INTERNAL_ERROR_CODE`](crate::error::INTERNAL_ERROR_CODE). The error is
/// still returned to the caller.
pub fn error_handler() -> Middleware {
    middleware_fn(|next| Arc::new(ErrorHandler { next }))
}

struct ErrorHandler {
    next: Arc<dyn StreamHandler>,
}

#[async_trait]
impl StreamHandler for ErrorHandler {
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        let stream_id = stream.id();
        match self.next.handle_stream(ctx, stream).await {
            Ok(()) => Ok(()),
            Err(error) => {
                let code = error.wire_code();
                log_handler_error(&error, stream_id, code);
                stream.cancel_write(code);
                Err(error)
            }
        }
    }
}

fn log_handler_error(error: &HandlerError, stream_id: u64, code: u64) {
    let level = error.log_level();
    if level == Level::ERROR {
        tracing::error!(stream_id, code, "Stream handler failed: {}", error);
    } else if level == Level::WARN {
        tracing::warn!(stream_id, code, "Stream handler failed: {}", error);
    } else if level == Level::INFO {
        tracing::info!(stream_id, code, "Stream handler failed: {}", error);
    } else if level == Level::DEBUG {
        tracing::debug!(stream_id, code, "Stream handler failed: {}", error);
    } else {
        tracing::trace!(stream_id, code, "Stream handler failed: {}", error);
    }
}

/// Limits request bodies to `max_bytes` decoded bytes.
///
/// The raw read is cut off at [`max_envelope_size`], the largest envelope
/// that can carry such a body, so an oversized request is never buffered
/// in full. The exact limit is recorded in the context and enforced on the
/// decoded body by [`decode_request`].
pub fn max_request_body_size(max_bytes: u64) -> Middleware {
    middleware_fn(move |next| Arc::new(MaxRequestBodySize { next, max_bytes }))
}

struct MaxRequestBodySize {
    next: Arc<dyn StreamHandler>,
    max_bytes: u64,
}

#[async_trait]
impl StreamHandler for MaxRequestBodySize {
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        let mut limited = LimitedStream::new(stream, max_envelope_size(self.max_bytes));
        self.next
            .handle_stream(ctx.with_body_limit(self.max_bytes), &mut limited)
            .await
    }
}

/// Reads the request envelope to end-of-stream and attaches it to the
/// context.
///
/// A malformed envelope, or a body over the context's body limit, fails
/// the stream before the wrapped handler runs.
pub fn decode_request() -> Middleware {
    middleware_fn(|next| Arc::new(DecodeRequest { next }))
}

struct DecodeRequest {
    next: Arc<dyn StreamHandler>,
}

#[async_trait]
impl StreamHandler for DecodeRequest {
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        let request = Request::decode(stream).await?;
        let size = request.body.len() as u64;
        if let Some(limit) = ctx.body_limit() {
            if size > limit {
                return Err(EnvelopeError::BodyTooLarge { size, limit }.into());
            }
        }
        tracing::trace!(
            stream_id = stream.id(),
            "Decoded request with {} body bytes and {} headers",
            request.body.len(),
            request.headers.len()
        );
        self.next
            .handle_stream(ctx.with_request(request), stream)
            .await
    }
}

/// Attaches a request id to the context and runs the wrapped handler
/// inside a `request` span carrying it.
///
/// The id is taken from the `x-request-id` header when present and
/// non-empty, otherwise a fresh one is generated. Must run behind
/// [`decode_request`].
pub fn request_id() -> Middleware {
    middleware_fn(|next| Arc::new(AttachRequestId { next }))
}

struct AttachRequestId {
    next: Arc<dyn StreamHandler>,
}

#[async_trait]
impl StreamHandler for AttachRequestId {
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        let request = ctx
            .request()
            .ok_or_else(|| HandlerError::msg("request not found in context"))?;
        let request_id = request
            .header(REQUEST_ID_HEADER)
            .and_then(RequestId::parse)
            .unwrap_or_else(RequestId::next);

        let span = tracing::info_span!("request", request_id = %request_id);
        let ctx = ctx.with_request_id(request_id);
        self.next.handle_stream(ctx, stream).instrument(span).await
    }
}
