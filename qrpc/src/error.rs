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

//! Error classification for stream handlers.
//!
//! Handlers fail with a [`HandlerError`]. What the remote peer observes is
//! decided by two optional capabilities of the underlying error, both
//! expressed through the [`ErrorClass`] trait:
//!
//! - **Wire code**: [`ErrorClass::error_code`] names the numeric code the
//!   stream is reset with. Errors without one are reported with
//!   [`INTERNAL_ERROR_CODE`], so internal details never reach the peer.
//! - **Log level**: [`ErrorClass::log_level`] picks the severity the failure
//!   is logged at. Errors without one are logged at `ERROR`.
//!
//! ```rust
//! use qrpc::error::{ErrorClass, HandlerError, INTERNAL_ERROR_CODE};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("user not found")]
//! struct NotFound;
//!
//! impl ErrorClass for NotFound {
//!     fn error_code(&self) -> Option<u64> {
//!         Some(404)
//!     }
//! }
//!
//! let error: HandlerError = NotFound.into();
//! assert_eq!(error.wire_code(), 404);
//!
//! let opaque = HandlerError::msg("database unavailable");
//! assert_eq!(opaque.wire_code(), INTERNAL_ERROR_CODE);
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::io;
use tracing::Level;

/// Wire code used for any failure that does not carry its own code.
pub const INTERNAL_ERROR_CODE: u64 = 500;

/// Optional classification capabilities of an error type.
///
/// Both methods default to `None`; implement only the ones that apply.
/// Errors implementing this trait convert into [`HandlerError`] with `?`.
pub trait ErrorClass {
    /// Wire code the stream is reset with when this error escapes a handler.
    fn error_code(&self) -> Option<u64> {
        None
    }

    /// Severity this error is logged at.
    fn log_level(&self) -> Option<Level> {
        None
    }
}

impl ErrorClass for io::Error {}

impl ErrorClass for serde_json::Error {}

/// Error returned by a [`StreamHandler`](crate::server::StreamHandler).
///
/// Captures the [`ErrorClass`] capabilities of its source at construction so
/// the error-mapping middleware can inspect them without knowing the
/// concrete type.
pub struct HandlerError {
    source: Box<dyn StdError + Send + Sync + 'static>,
    code: Option<u64>,
    level: Option<Level>,
}

impl HandlerError {
    /// Wraps an error without classification.
    ///
    /// Use this for third-party errors that do not implement [`ErrorClass`].
    pub fn other<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            source: Box::new(error),
            code: None,
            level: None,
        }
    }

    /// Creates an unclassified error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::other(Message(message.into()))
    }

    /// Overrides the wire code.
    #[must_use]
    pub fn with_code(mut self, code: u64) -> Self {
        self.code = Some(code);
        self
    }

    /// Overrides the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Returns the wire code carried by the error, if any.
    pub fn error_code(&self) -> Option<u64> {
        self.code
    }

    /// Returns the wire code the stream should be reset with.
    pub fn wire_code(&self) -> u64 {
        self.code.unwrap_or(INTERNAL_ERROR_CODE)
    }

    /// Returns the severity the error should be logged at.
    pub fn log_level(&self) -> Level {
        self.level.unwrap_or(Level::ERROR)
    }

    /// Attempts to downcast the wrapped error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

impl<E> From<E> for HandlerError
where
    E: ErrorClass + StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let code = error.error_code();
        let level = error.log_level();
        Self {
            source: Box::new(error),
            code,
            level,
        }
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("source", &self.source)
            .field("code", &self.code)
            .field("level", &self.level)
            .finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl StdError for HandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// A panic caught by the recovery middleware.
///
/// Carries the panic payload rendered as text and the backtrace captured at
/// the recovery boundary.
#[derive(Debug, thiserror::Error)]
#[error("[PANIC RECOVER] {message}\n{backtrace}")]
pub struct RecoveredPanic {
    message: String,
    backtrace: String,
}

impl RecoveredPanic {
    /// Builds a recovered panic from a payload returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            message,
            backtrace: std::backtrace::Backtrace::force_capture().to_string(),
        }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The captured backtrace.
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}

impl ErrorClass for RecoveredPanic {}
