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

//! Request ids for correlating a call across client and server logs.
//!
//! The id travels in the [`REQUEST_ID_HEADER`] header of the request
//! envelope. Ids generated here are random UUIDs, but any non-empty string
//! received from a peer is accepted as-is.

use std::fmt;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A request id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a new random request id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use qrpc::request_id::RequestId;
    ///
    /// let id = RequestId::next();
    /// assert_eq!(id.as_str().len(), 36);
    /// ```
    #[must_use]
    pub fn next() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an id received from a peer, or `None` if it is empty.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        (!value.is_empty()).then(|| Self(value.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}
