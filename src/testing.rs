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

//! In-memory adapter for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::bluetooth::ServiceIdentity;
use crate::platform::{Adapter, Endpoint};

const PIPE_CAPACITY: usize = 8 * 1024;

/// Adapter whose endpoints hand out `tokio::io::duplex` pipes.
pub(crate) struct MockAdapter {
    available: bool,
    enabled: AtomicBool,
    enable_refused: bool,
    fail_bind: bool,
    inbound: Mutex<Option<mpsc::Sender<DuplexStream>>>,
    closed: Arc<AtomicBool>,
    binds: AtomicUsize,
    peers: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            available: true,
            enabled: AtomicBool::new(true),
            enable_refused: false,
            fail_bind: false,
            inbound: Mutex::new(None),
            closed: Arc::new(AtomicBool::new(false)),
            binds: AtomicUsize::new(0),
            peers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn disabled(self) -> Self {
        self.enabled.store(false, Ordering::SeqCst);
        self
    }

    pub fn enable_refused(mut self) -> Self {
        self.enable_refused = true;
        self
    }

    pub fn failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn endpoint_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Connect as a peer. Fails when no endpoint is advertised.
    pub async fn connect(&self) -> io::Result<DuplexStream> {
        let tx = self
            .inbound
            .lock()
            .clone()
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))?;

        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        tx.send(server)
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::ConnectionRefused))?;
        Ok(client)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    type Endpoint = MockEndpoint;

    fn backend_name(&self) -> &'static str {
        "Mock"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn request_enable(&self) -> Result<()> {
        if self.enable_refused {
            return Err(anyhow!("user declined to enable the adapter"));
        }
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn bind(&self, _identity: &ServiceIdentity) -> io::Result<MockEndpoint> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        if self.fail_bind {
            return Err(io::Error::from(io::ErrorKind::AddrInUse));
        }

        let (tx, rx) = mpsc::channel(1);
        *self.inbound.lock() = Some(tx);
        self.closed.store(false, Ordering::SeqCst);

        Ok(MockEndpoint {
            incoming: rx,
            closed: self.closed.clone(),
            peers: self.peers.clone(),
        })
    }
}

pub(crate) struct MockEndpoint {
    incoming: mpsc::Receiver<DuplexStream>,
    closed: Arc<AtomicBool>,
    peers: Arc<AtomicUsize>,
}

#[async_trait]
impl Endpoint for MockEndpoint {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<(DuplexStream, String)> {
        let stream = self
            .incoming
            .recv()
            .await
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        let n = self.peers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((stream, format!("mock-peer-{}", n)))
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
