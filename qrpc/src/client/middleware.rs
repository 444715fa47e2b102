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


//! Standard client middleware.

use crate::client::ClientError;
use crate::client::round_trip::{Middleware, RoundTripper, middleware_fn};
use crate::context::CallContext;
use crate::envelope::{Request, Response};
use crate::request_id::{REQUEST_ID_HEADER, RequestId};
use async_trait::async_trait;
use std::sync::Arc;

/// Stamps outgoing requests with an `x-request-id` header.
///
/// The id attached to the context is propagated when there is one, so a
/// server calling onward keeps the id of the request it is serving;
/// otherwise a fresh id is generated. A header set explicitly on the
/// request is left alone.
pub fn request_id() -> Middleware {
    middleware_fn(|next| Arc::new(InjectRequestId { next }))
}

struct InjectRequestId {
    next: Arc<dyn RoundTripper>,
}

#[async_trait]
impl RoundTripper for InjectRequestId {
    async fn round_trip(
        &self,
        ctx: CallContext,
        mut request: Request,
    ) -> Result<Response, ClientError> {
        if request.header(REQUEST_ID_HEADER).is_none() {
            let request_id = ctx.request_id().cloned().unwrap_or_else(RequestId::next);
            request
                .headers
                .insert(REQUEST_ID_HEADER.to_string(), request_id.into());
        }
        self.next.round_trip(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::round_trip::round_tripper_fn;

    async fn stamped(ctx: CallContext, request: Request) -> Option<String> {
        let echo: Arc<dyn RoundTripper> = Arc::new(round_tripper_fn(|_ctx, request| async move {
            Ok(Response::new(
                request.header(REQUEST_ID_HEADER).unwrap_or_default(),
            ))
        }));
        let tripper = request_id()(echo);
        let response = tripper.round_trip(ctx, request).await.unwrap();
        String::from_utf8(response.body).ok().filter(|id| !id.is_empty())
    }

    #[tokio::test]
    async fn test_propagates_context_id() {
        let ctx = CallContext::background().with_request_id(RequestId::parse("upstream").unwrap());
        let id = stamped(ctx, Request::new("127.0.0.1:1")).await;
        assert_eq!(id.as_deref(), Some("upstream"));
    }

    #[tokio::test]
    async fn test_generates_fresh_id() {
        let first = stamped(CallContext::background(), Request::new("127.0.0.1:1")).await;
        let second = stamped(CallContext::background(), Request::new("127.0.0.1:1")).await;
        assert!(first.is_some());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_keeps_explicit_header() {
        let mut request = Request::new("127.0.0.1:1");
        request
            .headers
            .insert(REQUEST_ID_HEADER.to_string(), "explicit".to_string());
        let ctx = CallContext::background().with_request_id(RequestId::parse("upstream").unwrap());
        let id = stamped(ctx, request).await;
        assert_eq!(id.as_deref(), Some("explicit"));
    }
}
