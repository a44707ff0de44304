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

//! BlueZ adapter backed by an RFCOMM profile registration.
//!
//! Registering the profile publishes the SDP service record for the identity
//! and makes BlueZ hand us incoming connect requests. Dropping the profile
//! handle unregisters it, which is how the endpoint is closed.

use anyhow::Result;
use async_trait::async_trait;
use bluer::rfcomm::{Profile, ProfileHandle, Role, Stream};
use bluer::Address;
use futures::StreamExt;
use std::io;
use tracing::{debug, info, warn};

use super::identity::ServiceIdentity;
use crate::config::BluetoothConfig;
use crate::platform::{Adapter, Endpoint};

fn to_io(e: bluer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// A paired Bluetooth device.
#[derive(Debug, Clone)]
pub struct PairedDevice {
    pub address: Address,
    pub name: String,
}

/// Adapter that talks to bluetoothd over D-Bus.
pub struct BluezAdapter {
    session: bluer::Session,
    adapter: Option<bluer::Adapter>,
    config: BluetoothConfig,
}

impl BluezAdapter {
    /// Connect to BlueZ and pick the configured (or default) adapter.
    ///
    /// A missing adapter is not an error here; it is reported by `is_available`.
    pub async fn new(config: &BluetoothConfig) -> Result<Self> {
        info!("Initializing Bluetooth adapter...");

        let session = bluer::Session::new().await?;
        info!("BlueZ session created");

        let adapter = match &config.adapter {
            Some(name) => session.adapter(name).ok(),
            None => session.default_adapter().await.ok(),
        };

        match &adapter {
            Some(adapter) => info!("Using Bluetooth adapter: {}", adapter.name()),
            None => warn!("No Bluetooth adapter found"),
        }

        Ok(Self {
            session,
            adapter,
            config: config.clone(),
        })
    }

    /// Get the adapter address.
    pub async fn address(&self) -> Result<Address> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No Bluetooth adapter"))?;
        Ok(adapter.address().await?)
    }

    /// Get paired devices.
    pub async fn paired_devices(&self) -> Result<Vec<PairedDevice>> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No Bluetooth adapter"))?;
        let mut devices = Vec::new();

        for addr in adapter.device_addresses().await? {
            let device = adapter.device(addr)?;
            if device.is_paired().await? {
                let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
                devices.push(PairedDevice {
                    address: addr,
                    name,
                });
            }
        }

        Ok(devices)
    }
}

#[async_trait]
impl Adapter for BluezAdapter {
    type Endpoint = BluezEndpoint;

    fn backend_name(&self) -> &'static str {
        "BlueZ"
    }

    async fn is_available(&self) -> bool {
        match &self.adapter {
            Some(adapter) => adapter.address().await.is_ok(),
            None => false,
        }
    }

    async fn is_enabled(&self) -> bool {
        match &self.adapter {
            Some(adapter) => adapter.is_powered().await.unwrap_or(false),
            None => false,
        }
    }

    async fn request_enable(&self) -> Result<()> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No Bluetooth adapter"))?;
        info!("Powering on Bluetooth adapter...");
        adapter.set_powered(true).await?;
        Ok(())
    }

    async fn bind(&self, identity: &ServiceIdentity) -> io::Result<BluezEndpoint> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no Bluetooth adapter"))?;

        let restore = if self.config.discoverable {
            let previous = Visibility {
                discoverable: adapter.is_discoverable().await.map_err(to_io)?,
                pairable: adapter.is_pairable().await.map_err(to_io)?,
            };
            adapter.set_discoverable(true).await.map_err(to_io)?;
            adapter.set_pairable(true).await.map_err(to_io)?;
            info!("Adapter is discoverable and pairable");
            Some((adapter.clone(), previous))
        } else {
            None
        };

        let profile = Profile {
            uuid: identity.uuid(),
            name: Some(identity.name().to_string()),
            channel: Some(self.config.channel.into()),
            role: Some(Role::Server),
            require_authentication: Some(self.config.require_authentication),
            require_authorization: Some(false),
            ..Default::default()
        };

        let handle = self.session.register_profile(profile).await.map_err(to_io)?;
        info!(
            "RFCOMM profile registered on channel {} (UUID: {})",
            self.config.channel,
            identity.uuid()
        );

        Ok(BluezEndpoint { handle, restore })
    }
}

/// Adapter visibility before `bind` changed it.
#[derive(Debug, Clone, Copy)]
struct Visibility {
    discoverable: bool,
    pairable: bool,
}

/// Registered RFCOMM profile. Dropping it withdraws the service record and
/// puts discoverable/pairable back the way `bind` found them.
pub struct BluezEndpoint {
    handle: ProfileHandle,
    restore: Option<(bluer::Adapter, Visibility)>,
}

impl Drop for BluezEndpoint {
    fn drop(&mut self) {
        let Some((adapter, previous)) = self.restore.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to restore adapter visibility");
            return;
        };

        runtime.spawn(async move {
            if let Err(e) = adapter.set_discoverable(previous.discoverable).await {
                warn!("Failed to restore discoverable: {}", e);
            }
            if let Err(e) = adapter.set_pairable(previous.pairable).await {
                warn!("Failed to restore pairable: {}", e);
            }
            debug!("Adapter visibility restored");
        });
    }
}

#[async_trait]
impl Endpoint for BluezEndpoint {
    type Stream = Stream;

    async fn accept(&mut self) -> io::Result<(Stream, String)> {
        let request = self.handle.next().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "RFCOMM profile was unregistered")
        })?;

        let peer = request.device().to_string();
        debug!("Connect request from {}", peer);

        let stream = request
            .accept()
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionAborted, e))?;
        Ok((stream, peer))
    }
}
