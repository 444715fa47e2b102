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


//! Traffic logging middleware.

use crate::context::CallContext;
use crate::error::HandlerError;
use crate::server::handler::{Middleware, StreamHandler, middleware_fn};
use crate::stream::{Stream, TeeStream};
use async_trait::async_trait;
use std::sync::Arc;

/// Which bodies [`log_traffic`] records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Log the bytes read from the stream.
    pub log_request_body: bool,
    /// Log the bytes written to the stream.
    pub log_response_body: bool,
}

impl LogConfig {
    /// Logs both bodies when `log_body` is set.
    pub fn new(log_body: bool) -> Self {
        Self {
            log_request_body: log_body,
            log_response_body: log_body,
        }
    }

    /// Toggles request body logging.
    #[must_use]
    pub fn with_log_request_body(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }

    /// Toggles response body logging.
    #[must_use]
    pub fn with_log_response_body(mut self, enabled: bool) -> Self {
        self.log_response_body = enabled;
        self
    }
}

/// Copies the stream's traffic aside and logs it at `DEBUG` once the
/// wrapped handler succeeds.
///
/// Traffic passes through unchanged. Nothing is logged for a failed
/// handler; the error middleware reports those. Placed outside
/// [`decode_request`](crate::server::middleware::decode_request), the
/// request body is the raw envelope as read off the wire.
pub fn log_traffic(config: LogConfig) -> Middleware {
    middleware_fn(move |next| Arc::new(TrafficLog { next, config }))
}

struct TrafficLog {
    next: Arc<dyn StreamHandler>,
    config: LogConfig,
}

#[async_trait]
impl StreamHandler for TrafficLog {
    async fn handle_stream(
        &self,
        ctx: CallContext,
        stream: &mut dyn Stream,
    ) -> Result<(), HandlerError> {
        let mut tee = TeeStream::new(stream);
        self.next.handle_stream(ctx, &mut tee).await?;

        let stream_id = tee.id();
        if self.config.log_request_body {
            tracing::debug!(
                stream_id,
                "Quic request body: {}",
                String::from_utf8_lossy(tee.read_bytes())
            );
        }
        if self.config.log_response_body {
            tracing::debug!(
                stream_id,
                "Quic response body: {}",
                String::from_utf8_lossy(tee.written_bytes())
            );
        }
        Ok(())
    }
}
