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

//! Server status shared between the serving task and its owner.

use parking_lot::RwLock;
use std::sync::Arc;

/// Server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Listening,
    Connected,
    Error,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Stopped => "Stopped",
            ServerStatus::Listening => "Listening...",
            ServerStatus::Connected => "Connected",
            ServerStatus::Error => "Error",
        }
    }
}

/// Shared server state.
#[derive(Debug)]
pub struct ServerState {
    /// Current server status.
    pub status: RwLock<ServerStatus>,

    /// Connected peer address.
    pub peer: RwLock<Option<String>>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            status: RwLock::new(ServerStatus::Stopped),
            peer: RwLock::new(None),
        }
    }
}

impl ServerState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_listening(&self) {
        *self.status.write() = ServerStatus::Listening;
    }

    pub fn set_connected(&self, peer: String) {
        *self.status.write() = ServerStatus::Connected;
        *self.peer.write() = Some(peer);
    }

    pub fn set_stopped(&self) {
        *self.status.write() = ServerStatus::Stopped;
        *self.peer.write() = None;
    }

    pub fn set_error(&self) {
        *self.status.write() = ServerStatus::Error;
    }

    pub fn get_status(&self) -> ServerStatus {
        *self.status.read()
    }

    pub fn get_peer(&self) -> Option<String> {
        self.peer.read().clone()
    }
}
