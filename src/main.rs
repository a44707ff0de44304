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

//! SPP Echo Server

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spp_echo::bluetooth::BluezAdapter;
use spp_echo::config::Config;
use spp_echo::platform::LogNotifier;
use spp_echo::EchoServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("spp_echo=info".parse()?))
        .init();

    info!("Starting SPP echo server v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    let adapter = BluezAdapter::new(&config.bluetooth).await?;
    match adapter.address().await {
        Ok(address) => info!("Adapter address: {}", address),
        Err(e) => warn!("Could not read adapter address: {}", e),
    }

    let server = EchoServer::new(adapter, config.permissions.grant_set(), Arc::new(LogNotifier))
        .with_power_on(config.bluetooth.power_on)
        .with_accept_timeout(config.listener.accept_timeout());

    let mut handle = match server.start().await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            if e.is_precondition() {
                error!("Check the adapter power state and [permissions] in the config file");
            }
            return Err(e.into());
        }
    };

    info!("Ready. Waiting for a peer.");

    tokio::select! {
        _ = handle.wait() => {
            info!("Session finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    handle.stop().await;

    info!("SPP echo server stopped");
    Ok(())
}
