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


//! The round-trip contract and client middleware composition.

use crate::client::ClientError;
use crate::context::CallContext;
use crate::envelope::{Request, Response};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Performs one request/response exchange.
///
/// The client's physical layer opens a stream on a pooled connection;
/// middleware wraps it to observe or amend requests on the way out.
#[async_trait]
pub trait RoundTripper: Send + Sync + 'static {
    /// Sends `request` and waits for its response.
    async fn round_trip(&self, ctx: CallContext, request: Request)
    -> Result<Response, ClientError>;
}

/// A function from round tripper to round tripper.
pub type Middleware = Arc<dyn Fn(Arc<dyn RoundTripper>) -> Arc<dyn RoundTripper> + Send + Sync>;

/// Builds a [`Middleware`] from a closure.
pub fn middleware_fn<F>(f: F) -> Middleware
where
    F: Fn(Arc<dyn RoundTripper>) -> Arc<dyn RoundTripper> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Adapts an async function into a [`RoundTripper`].
///
/// ```rust
/// use qrpc::client::round_tripper_fn;
/// use qrpc::envelope::Response;
///
/// let canned = round_tripper_fn(|_ctx, _request| async move { Ok(Response::new("ok")) });
/// ```
pub fn round_tripper_fn<F, Fut>(f: F) -> RoundTripperFn<F>
where
    F: Fn(CallContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    RoundTripperFn { f }
}

/// Round tripper returned by [`round_tripper_fn`].
pub struct RoundTripperFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> RoundTripper for RoundTripperFn<F>
where
    F: Fn(CallContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    async fn round_trip(
        &self,
        ctx: CallContext,
        request: Request,
    ) -> Result<Response, ClientError> {
        (self.f)(ctx, request).await
    }
}

/// Composes `middlewares` around `tripper`, first middleware outermost.
pub(crate) fn chain(
    tripper: Arc<dyn RoundTripper>,
    middlewares: &[Middleware],
) -> Arc<dyn RoundTripper> {
    middlewares
        .iter()
        .rev()
        .fold(tripper, |next, middleware| middleware(next))
}
