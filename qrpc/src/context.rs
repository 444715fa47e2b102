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

//! Per-call context.
//!
//! A [`CallContext`] travels alongside every request through the middleware
//! chain on both sides. It carries the call's cancellation token and the
//! values middleware attach on the way in: the request body limit, the
//! decoded request and the request id. Contexts are cheap to clone and are extended by value; a
//! middleware never mutates the context its caller holds.

use crate::envelope::Request;
use crate::request_id::RequestId;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context of a single call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    request: Option<Arc<Request>>,
    request_id: Option<RequestId>,
    body_limit: Option<u64>,
}

impl CallContext {
    /// Creates a context bound to `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            request: None,
            request_id: None,
            body_limit: None,
        }
    }

    /// Creates a context that is never cancelled unless its token is.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns the cancellation token of the call.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` once the call has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a context whose token is a child of this one.
    ///
    /// Cancelling the child leaves this context untouched.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            request: self.request.clone(),
            request_id: self.request_id.clone(),
            body_limit: self.body_limit,
        }
    }

    /// Attaches a decoded request.
    #[must_use]
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(Arc::new(request));
        self
    }

    /// Returns the decoded request, if the decode middleware has run.
    pub fn request(&self) -> Option<&Arc<Request>> {
        self.request.as_ref()
    }

    /// Attaches a request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Returns the request id, if one has been attached.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Sets the largest decoded request body, in bytes, the call accepts.
    #[must_use]
    pub fn with_body_limit(mut self, max_bytes: u64) -> Self {
        self.body_limit = Some(max_bytes);
        self
    }

    /// Returns the request body limit, if one has been set.
    pub fn body_limit(&self) -> Option<u64> {
        self.body_limit
    }
}
