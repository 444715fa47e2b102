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


use crate::client::{Client, ClientError};
use crate::context::CallContext;
use crate::envelope::{Request, Response};
use std::time::Duration;

/// Builds and sends one request.
///
/// Created by [`Client::request`].
///
/// ```rust,no_run
/// use qrpc::client::Client;
/// use qrpc::context::CallContext;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), qrpc::client::ClientError> {
/// let client = Client::builder().build()?;
/// let response = client
///     .request("127.0.0.1:4433")
///     .timeout(Duration::from_secs(3))
///     .body("ping")
///     .send(CallContext::background())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[must_use = "a request does nothing until it is sent"]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    request: Request,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client, address: &str) -> Self {
        Self {
            client,
            request: Request::new(address),
        }
    }

    /// Overrides the destination address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.request.address = address.into();
        self
    }

    /// Bounds the whole call. Zero means unbounded.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    /// Sets a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Returns the request built so far.
    pub fn build(self) -> Request {
        self.request
    }

    /// Sends the request through the client's middleware chain.
    pub async fn send(self, ctx: CallContext) -> Result<Response, ClientError> {
        self.client.send(ctx, self.request).await
    }
}
