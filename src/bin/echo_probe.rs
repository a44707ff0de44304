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

//! Peer-side probe for the echo server.
//!
//! Usage: cargo run --bin echo_probe -- [list | send <ADDR> <TEXT> [CHANNEL]]

use anyhow::{anyhow, bail, Result};
use bluer::rfcomm::{SocketAddr, Stream};
use bluer::Address;
use std::env;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use spp_echo::bluetooth::{BluezAdapter, DEFAULT_RFCOMM_CHANNEL};
use spp_echo::config::BluetoothConfig;

const ECHO_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("list");

    match mode {
        "list" => list().await,
        "send" => {
            let address: Address = args
                .get(2)
                .ok_or_else(|| anyhow!("missing device address"))?
                .parse()?;
            let text = args.get(3).ok_or_else(|| anyhow!("missing text to send"))?;
            let channel = match args.get(4) {
                Some(c) => c.parse()?,
                None => DEFAULT_RFCOMM_CHANNEL,
            };
            send(address, channel, text).await
        }
        _ => {
            println!("Unknown mode: {}", mode);
            println!("Usage: echo_probe [list | send <ADDR> <TEXT> [CHANNEL]]");
            Ok(())
        }
    }
}

async fn list() -> Result<()> {
    let adapter = BluezAdapter::new(&BluetoothConfig::default()).await?;
    let devices = adapter.paired_devices().await?;

    if devices.is_empty() {
        println!("No paired devices.");
    }
    for device in devices {
        println!("{}  {}", device.address, device.name);
    }
    Ok(())
}

async fn send(address: Address, channel: u8, text: &str) -> Result<()> {
    println!("Connecting to {} on channel {}...", address, channel);
    let mut stream = Stream::connect(SocketAddr::new(address, channel)).await?;
    println!("Connected.");

    stream.write_all(text.as_bytes()).await?;
    stream.flush().await?;
    println!("Sent: {}", text);

    // Echoes may come back split across several reads.
    let mut echoed = vec![0u8; text.len()];
    match tokio::time::timeout(ECHO_TIMEOUT, stream.read_exact(&mut echoed)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => bail!("connection closed before the echo arrived: {}", e),
        Err(_) => bail!("no echo within {:?}", ECHO_TIMEOUT),
    }

    println!("Received: {}", String::from_utf8_lossy(&echoed));
    if echoed != text.as_bytes() {
        bail!("echo did not match what was sent");
    }
    Ok(())
}
