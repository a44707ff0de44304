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

//! Bluetooth communication module.
//!
//! Serves the SPP service over RFCOMM: a one-shot listener hands its single
//! peer to an echo session.

mod bluez;
mod identity;
mod listener;
mod session;

pub use bluez::{BluezAdapter, BluezEndpoint, PairedDevice};
pub use identity::{
    ServiceIdentity, DEFAULT_RFCOMM_CHANNEL, ECHO_BUFFER_SIZE, SPP_SERVICE_NAME, SPP_UUID,
};
pub use listener::{Connection, Listener, ListenerHandle, ListenerState};
pub use session::{Session, SessionHandle};
