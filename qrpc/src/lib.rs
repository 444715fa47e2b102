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


#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! - **[`server`]**: accept and stream loops, the handler contract and the
//!   server middleware set
//! - **[`client`]**: connection pool, request builder and client middleware
//! - **[`stream`]**: the [`Stream`](stream::Stream) abstraction and its
//!   wrappers
//! - **[`envelope`]**: request and response envelopes
//! - **[`error`]** and **[`api_error`]**: error classification and the
//!   mapping to wire codes
//! - **[`context`]** and **[`request_id`]**: per-call values
//! - **[`config`]** and **[`tls`]**: QUIC and TLS settings

pub mod api_error;
pub mod client;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod request_id;
pub mod server;
pub mod stream;
pub mod tls;

pub use api_error::ApiError;
pub use client::{Client, ClientError};
pub use context::CallContext;
pub use envelope::{Request, Response};
pub use error::{ErrorClass, HandlerError, INTERNAL_ERROR_CODE};
pub use server::{Server, ServerError, StreamHandler};
pub use stream::Stream;
