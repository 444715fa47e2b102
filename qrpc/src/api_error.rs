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

//! Application errors carrying a wire code and a log level.

use crate::error::{ErrorClass, INTERNAL_ERROR_CODE};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;
use tracing::Level;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A classified application error.
///
/// `ApiError` implements both [`ErrorClass`] capabilities, so a handler
/// returning it resets the stream with [`code`](ApiError::code) and is
/// logged at [`level`](ApiError::level).
///
/// # Examples
///
/// ```rust
/// use qrpc::api_error::ApiError;
/// use qrpc::error::HandlerError;
///
/// let error = ApiError::business(1001, "insufficient balance", None);
/// let error: HandlerError = error.into();
/// assert_eq!(error.wire_code(), 1001);
/// assert_eq!(error.log_level(), tracing::Level::WARN);
/// ```
#[derive(Debug, Error)]
#[error("error code: {code}, message: {message}{}", CauseSuffix(.cause))]
pub struct ApiError {
    code: u64,
    message: String,
    details: HashMap<String, serde_json::Value>,
    #[source]
    cause: Option<BoxError>,
    level: Level,
}

impl ApiError {
    /// Creates an error logged at `ERROR`.
    pub fn new(code: u64, message: impl Into<String>, cause: Option<BoxError>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
            cause,
            level: Level::ERROR,
        }
    }

    /// An internal failure, reported with [`INTERNAL_ERROR_CODE`].
    pub fn internal<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(
            INTERNAL_ERROR_CODE,
            "internal service error",
            Some(Box::new(cause)),
        )
    }

    /// An expected business rule violation, logged at `WARN`.
    pub fn business(code: u64, message: impl Into<String>, cause: Option<BoxError>) -> Self {
        Self::new(code, message, cause).with_log_level(Level::WARN)
    }

    /// Overrides the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Attaches structured details for callers that inspect the error.
    #[must_use]
    pub fn with_details(mut self, details: HashMap<String, serde_json::Value>) -> Self {
        self.details = details;
        self
    }

    /// The wire code.
    pub fn code(&self) -> u64 {
        self.code
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured details.
    pub fn details(&self) -> &HashMap<String, serde_json::Value> {
        &self.details
    }

    /// The log level.
    pub fn level(&self) -> Level {
        self.level
    }
}

impl ErrorClass for ApiError {
    fn error_code(&self) -> Option<u64> {
        Some(self.code)
    }

    fn log_level(&self) -> Option<Level> {
        Some(self.level)
    }
}

struct CauseSuffix<'a>(&'a Option<BoxError>);

impl fmt::Display for CauseSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(cause) => write!(f, ", cause: {}", cause),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::io;

    #[test]
    fn test_internal_error() {
        let error = ApiError::internal(io::Error::other("connection refused"));
        assert_eq!(error.code(), INTERNAL_ERROR_CODE);
        assert_eq!(error.level(), Level::ERROR);
        assert!(error.source().is_some());
        assert_eq!(
            error.to_string(),
            "error code: 500, message: internal service error, cause: connection refused"
        );
    }

    #[test]
    fn test_business_error() {
        let error = ApiError::business(1001, "limit exceeded", None);
        assert_eq!(error.error_code(), Some(1001));
        assert_eq!(error.log_level(), Some(Level::WARN));
        assert!(error.source().is_none());
        assert_eq!(error.to_string(), "error code: 1001, message: limit exceeded");
    }

    #[test]
    fn test_details_and_level() {
        let mut details = HashMap::new();
        details.insert("field".to_string(), serde_json::json!("amount"));

        let error = ApiError::new(400, "validation failed", None)
            .with_details(details)
            .with_log_level(Level::DEBUG);
        assert_eq!(error.details()["field"], "amount");

        let error: HandlerError = error.into();
        assert_eq!(error.wire_code(), 400);
        assert_eq!(error.log_level(), Level::DEBUG);
    }
}
