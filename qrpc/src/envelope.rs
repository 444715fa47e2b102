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

//! Request and response envelopes.
//!
//! Exactly one envelope travels in each direction of a stream. Each is a
//! single JSON document:
//!
//! ```text
//! { "body": "<base64>", "headers": { "x-request-id": "..." } }
//! ```
//!
//! The request envelope is written by the client and followed by a
//! half-close of its write side; the server reads it to end-of-stream. The
//! response envelope is written by the handler and likewise followed by a
//! half-close. A `null` body or header map decodes as empty.

use crate::error::ErrorClass;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors produced while reading or writing an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Reading the envelope from the stream failed.
    #[error("read envelope: {source}")]
    Read {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing the envelope to the stream failed.
    #[error("write envelope: {source}")]
    Write {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The request document could not be decoded.
    #[error("decode request: {source}")]
    DecodeRequest {
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The response document could not be decoded.
    #[error("decode response: {source}")]
    DecodeResponse {
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The decoded request body is larger than the server accepts.
    #[error("request body of {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge {
        /// Decoded body size
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// The envelope could not be encoded.
    #[error("encode envelope: {source}")]
    Encode {
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

impl ErrorClass for EnvelopeError {}

/// Room left in an envelope for everything but the encoded body: JSON
/// framing, header names and values.
pub const ENVELOPE_OVERHEAD: u64 = 64 * 1024;

/// Largest request envelope that can carry a body of `max_body_bytes`.
///
/// The body travels base64 encoded, so it takes four bytes on the wire for
/// every three decoded bytes, plus [`ENVELOPE_OVERHEAD`].
pub fn max_envelope_size(max_body_bytes: u64) -> u64 {
    max_body_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_OVERHEAD)
}

/// A request envelope.
///
/// `address` and `timeout` describe the call and are never put on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Destination address, e.g. `127.0.0.1:4433`.
    #[serde(skip)]
    pub address: String,

    /// Per-call timeout. `None` or zero means unbounded.
    #[serde(skip)]
    pub timeout: Option<Duration>,

    /// Opaque request payload.
    #[serde(default, with = "base64_body")]
    pub body: Vec<u8>,

    /// Request headers.
    #[serde(default, deserialize_with = "nullable_headers")]
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Creates an empty request for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Encodes the wire document.
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|source| EnvelopeError::Encode { source })
    }

    /// Decodes a wire document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|source| EnvelopeError::DecodeRequest { source })
    }

    /// Reads a request from `reader` until end-of-stream and decodes it.
    pub async fn decode<R>(reader: &mut R) -> Result<Self, EnvelopeError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let bytes = read_document(reader).await?;
        Self::from_slice(&bytes)
    }

    /// Writes the request and half-closes the write side.
    pub async fn write<W>(&self, writer: &mut W) -> Result<(), EnvelopeError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        write_document(writer, &self.encode()?).await
    }
}

/// A response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Opaque response payload.
    #[serde(default, with = "base64_body")]
    pub body: Vec<u8>,

    /// Response headers.
    #[serde(default, deserialize_with = "nullable_headers")]
    pub headers: HashMap<String, String>,
}

impl Response {
    /// Creates a response with the given body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Encodes the wire document.
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|source| EnvelopeError::Encode { source })
    }

    /// Decodes a wire document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|source| EnvelopeError::DecodeResponse { source })
    }

    /// Reads a response from `reader` until end-of-stream and decodes it.
    pub async fn decode<R>(reader: &mut R) -> Result<Self, EnvelopeError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let bytes = read_document(reader).await?;
        Self::from_slice(&bytes)
    }

    /// Writes the response and half-closes the write side.
    ///
    /// This is the only way a handler should answer: it must be called at
    /// most once per stream.
    pub async fn write<W>(&self, writer: &mut W) -> Result<(), EnvelopeError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        write_document(writer, &self.encode()?).await
    }
}

async fn read_document<R>(reader: &mut R) -> Result<Vec<u8>, EnvelopeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|source| EnvelopeError::Read { source })?;
    Ok(bytes)
}

async fn write_document<W>(writer: &mut W, bytes: &[u8]) -> Result<(), EnvelopeError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer
        .write_all(bytes)
        .await
        .map_err(|source| EnvelopeError::Write { source })?;
    writer
        .shutdown()
        .await
        .map_err(|source| EnvelopeError::Write { source })
}

fn nullable_headers<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

mod base64_body {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    pub fn serialize<S>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
