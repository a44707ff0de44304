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

//! Configuration module.
//!
//! Handles loading and saving server settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::DEFAULT_RFCOMM_CHANNEL;
use crate::platform::{Capability, GrantSet};

const APP_DIR: &str = "spp-echo";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Listener settings.
    pub listener: ListenerConfig,

    /// Permissions the host platform has granted.
    pub permissions: PermissionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter name (e.g. "hci0"). Uses the default adapter when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,

    /// RFCOMM channel to serve on.
    pub channel: u8,

    /// Power the adapter on if it is off.
    pub power_on: bool,

    /// Make the adapter discoverable and pairable while listening.
    pub discoverable: bool,

    /// Require an authenticated (paired) link.
    pub require_authentication: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            channel: DEFAULT_RFCOMM_CHANNEL,
            power_on: true,
            discoverable: true,
            require_authentication: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Give up waiting for a peer after this many seconds. Waits forever when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_timeout_secs: Option<u64>,
}

impl ListenerConfig {
    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Capabilities granted to this process.
    pub granted: Vec<Capability>,

    /// Whether the platform ties location access to radio scanning.
    pub location_coupled: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            granted: vec![
                Capability::RadioDiscover,
                Capability::RadioConnect,
                Capability::RadioAdvertise,
            ],
            location_coupled: false,
        }
    }
}

impl PermissionsConfig {
    pub fn grant_set(&self) -> GrantSet {
        GrantSet::new(self.granted.iter().copied(), self.location_coupled)
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
