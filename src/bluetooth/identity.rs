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

//! Advertised service identity and RFCOMM constants.

use std::fmt;
use uuid::Uuid;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Service record name advertised alongside the UUID.
pub const SPP_SERVICE_NAME: &str = "BluetoothSPPServer";

/// Default RFCOMM channel.
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

/// Size of the read buffer reused across a session.
pub const ECHO_BUFFER_SIZE: usize = 1024;

/// Identifies the advertised service so a peer can open the right channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceIdentity {
    uuid: Uuid,
    name: &'static str,
}

impl ServiceIdentity {
    pub const fn new(uuid: Uuid, name: &'static str) -> Self {
        Self { uuid, name }
    }

    /// The serial port profile identity served by this crate.
    pub const fn serial_port() -> Self {
        Self::new(SPP_UUID, SPP_SERVICE_NAME)
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            SPP_UUID.to_string().to_lowercase(),
            "00001101-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_serial_port_identity() {
        let identity = ServiceIdentity::serial_port();
        assert_eq!(identity.uuid(), SPP_UUID);
        assert_eq!(identity.name(), "BluetoothSPPServer");
        assert_eq!(
            identity.to_string(),
            "BluetoothSPPServer (00001101-0000-1000-8000-00805f9b34fb)"
        );
    }
}
