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


use thiserror::Error;

/// Errors returned by [`Server`](crate::server::Server).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server was built without a TLS configuration.
    #[error("TLS config must be set")]
    MissingTlsConfig,

    /// The listen address could not be resolved.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The address as given
        address: String,
        /// Why resolution failed
        reason: String,
    },

    /// The UDP socket could not be bound.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address as given
        address: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
