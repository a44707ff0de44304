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

//! Fire-and-forget status notifications.

use tokio::sync::mpsc;
use tracing::{debug, info};

/// Status strings shown to the user.
pub mod messages {
    pub const SERVER_STARTED: &str = "Bluetooth server started";
    pub const SERVER_STOPPED: &str = "Bluetooth server stopped";
    pub const PERMISSIONS_DENIED: &str = "Permissions denied";
    pub const NOT_SUPPORTED: &str = "Bluetooth not supported on this device";
}

/// Sink for short human-readable status strings.
///
/// Implementations must not block and must swallow delivery failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}

/// Forwards notifications over a channel, dropping them when it is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<String>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) {
        if let Err(e) = self.tx.try_send(message.to_string()) {
            debug!("Notification dropped: {}", e);
        }
    }
}
