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


//! The stream handler contract and middleware composition.

use crate::context::CallContext;
use crate::envelope::{Request, Response};
use crate::error::HandlerError;
use crate::stream::Stream;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Serves one accepted stream.
///
/// A handler reads the request from `stream`, writes exactly one response
/// and returns. Returning an error instead lets the error middleware reset
/// the stream with the error's wire code. Implementations must be safe to
/// call concurrently from many connection tasks.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use qrpc::context::CallContext;
/// use qrpc::envelope::Response;
/// use qrpc::error::HandlerError;
/// use qrpc::server::StreamHandler;
/// use qrpc::stream::Stream;
///
/// struct Pong;
///
/// #[async_trait]
/// impl StreamHandler for Pong {
///     async fn handle_stream(
///         &self,
///         _ctx: CallContext,
///         stream: &mut dyn Stream,
///     ) -> Result<(), HandlerError> {
///         Response::new("pong").write(stream).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    /// Handles a single stream.
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError>;
}

#[async_trait]
impl<H> StreamHandler for Arc<H>
where
    H: StreamHandler + ?Sized,
{
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        (**self).handle_stream(ctx, stream).await
    }
}

/// A function from handler to handler.
///
/// Middleware wraps the next handler with behavior that runs before and
/// after it. See [`chain_middleware`] for how a list is composed.
pub type Middleware = Arc<dyn Fn(Arc<dyn StreamHandler>) -> Arc<dyn StreamHandler> + Send + Sync>;

/// Builds a [`Middleware`] from a closure.
///
/// ```rust
/// use qrpc::server::{Middleware, middleware_fn};
///
/// let passthrough: Middleware = middleware_fn(|next| next);
/// ```
pub fn middleware_fn<F>(f: F) -> Middleware
where
    F: Fn(Arc<dyn StreamHandler>) -> Arc<dyn StreamHandler> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Composes `middlewares` around `handler`.
///
/// The first middleware is the outermost: it sees the stream first and the
/// outcome last. `chain_middleware(h, &[m1, m2, m3])` is `m1(m2(m3(h)))`.
pub fn chain_middleware(
    handler: Arc<dyn StreamHandler>,
    middlewares: &[Middleware],
) -> Arc<dyn StreamHandler> {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware(next))
}

/// Adapts a request/response function into a [`StreamHandler`].
///
/// The returned handler takes the decoded request from the context, so it
/// must run behind the decode middleware. The response is written with
/// [`Response::write`].
///
/// ```rust
/// use qrpc::envelope::Response;
/// use qrpc::server::unary;
///
/// let echo = unary(|_ctx, request| async move {
///     let mut body = b"echo: ".to_vec();
///     body.extend_from_slice(&request.body);
///     Ok(Response::new(body))
/// });
/// ```
pub fn unary<F, Fut>(f: F) -> Unary<F>
where
    F: Fn(CallContext, Arc<Request>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    Unary { f }
}

/// Handler returned by [`unary`].
pub struct Unary<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> StreamHandler for Unary<F>
where
    F: Fn(CallContext, Arc<Request>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        let request = ctx
            .request()
            .cloned()
            .ok_or_else(|| HandlerError::msg("request not found in context"))?;
        let response = (self.f)(ctx, request).await?;
        response.write(stream).await?;
        Ok(())
    }
}
