// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the echo server.

use std::io;

/// Errors raised by the listener, the session and their preconditions.
///
/// Every variant is terminal for the component that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bluetooth adapter not available")]
    AdapterUnavailable,

    #[error("Bluetooth adapter is powered off")]
    AdapterDisabled,

    #[error("Required Bluetooth permissions not granted")]
    PermissionDenied,

    #[error("Failed to bind or advertise service: {0}")]
    ListenFailure(#[source] io::Error),

    #[error("Accept failed: {0}")]
    AcceptFailure(#[source] io::Error),

    #[error("Stream I/O failed: {0}")]
    StreamFailure(#[source] io::Error),

    #[error("Echo server is already running")]
    AlreadyRunning,
}

impl ServerError {
    /// Whether the adapter or the granted permissions refused the start.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ServerError::AdapterUnavailable
                | ServerError::AdapterDisabled
                | ServerError::PermissionDenied
        )
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
