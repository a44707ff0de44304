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

//! Echo session over one accepted connection.
//!
//! Reads are echoed chunk by chunk exactly as they arrive. A read may hold a
//! partial or coalesced peer message; no attempt is made to restore message
//! boundaries.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::identity::ECHO_BUFFER_SIZE;
use super::listener::Connection;
use crate::error::{Result, ServerError};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Output half of the connection. `None` once the session has closed it.
type SharedWriter = Arc<Mutex<Option<BoxedWriter>>>;

/// Handle for sending to and cancelling a running session.
#[derive(Clone)]
pub struct SessionHandle {
    writer: SharedWriter,
    cancel: CancellationToken,
    peer: String,
    echoed: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Total bytes echoed back so far.
    pub fn bytes_echoed(&self) -> u64 {
        self.echoed.load(Ordering::Relaxed)
    }

    /// Close the connection. Safe to call repeatedly or after the session ended.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Session cancel requested for {}", self.peer);
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Send bytes outside the echo loop.
    ///
    /// Best effort: failures are logged and the bytes dropped.
    pub async fn write(&self, bytes: &[u8]) {
        match write_chunk(&self.writer, bytes, &self.cancel).await {
            Some(Ok(())) => debug!("Sent {} unsolicited bytes to {}", bytes.len(), self.peer),
            Some(Err(e)) => error!("Error occurred when sending data: {}", e),
            None => warn!("Session cancelled; dropped {} bytes", bytes.len()),
        }
    }
}

/// Owns one connected endpoint and echoes everything it reads.
pub struct Session {
    reader: BoxedReader,
    handle: SessionHandle,
}

impl Session {
    /// Take ownership of an accepted connection.
    pub fn new<S>(connection: Connection<S>, cancel: CancellationToken) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(connection.stream);
        let writer: BoxedWriter = Box::new(writer);

        Self {
            reader: Box::new(reader),
            handle: SessionHandle {
                writer: Arc::new(Mutex::new(Some(writer))),
                cancel,
                peer: connection.peer,
                echoed: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub async fn write(&self, bytes: &[u8]) {
        self.handle.write(bytes).await;
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Echo until the peer closes, an I/O error occurs or the session is cancelled.
    ///
    /// Peer close and cancellation return `Ok`; I/O errors return
    /// `StreamFailure`. Either way the loop ends and the connection is released.
    pub async fn run(self) -> Result<()> {
        let Session { mut reader, handle } = self;
        let mut buf = [0u8; ECHO_BUFFER_SIZE];

        info!("Session started with {}", handle.peer);

        let result = loop {
            let read = tokio::select! {
                biased;
                _ = handle.cancel.cancelled() => None,
                read = reader.read(&mut buf) => Some(read),
            };

            let n = match read {
                None => {
                    info!("Session with {} cancelled", handle.peer);
                    break Ok(());
                }
                Some(Ok(0)) => {
                    info!("Connection closed by remote");
                    break Ok(());
                }
                Some(Ok(n)) => n,
                Some(Err(e)) => {
                    error!("Input stream was disconnected: {}", e);
                    break Err(ServerError::StreamFailure(e));
                }
            };

            let chunk = &buf[..n];
            debug!("Received: {}", String::from_utf8_lossy(chunk));

            match write_chunk(&handle.writer, chunk, &handle.cancel).await {
                Some(Ok(())) => {
                    handle.echoed.fetch_add(n as u64, Ordering::Relaxed);
                    debug!("Sent: {}", String::from_utf8_lossy(chunk));
                }
                Some(Err(e)) => {
                    error!("Error occurred when echoing data: {}", e);
                    break Err(ServerError::StreamFailure(e));
                }
                None => {
                    info!("Session with {} cancelled", handle.peer);
                    break Ok(());
                }
            }
        };

        // Dropping both halves closes the connection.
        if let Some(mut writer) = handle.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        drop(reader);

        info!(
            "Session with {} ended after echoing {} bytes",
            handle.peer,
            handle.bytes_echoed()
        );
        result
    }
}

/// Write and flush `bytes`. `None` means the session was cancelled first.
async fn write_chunk(
    writer: &SharedWriter,
    bytes: &[u8],
    cancel: &CancellationToken,
) -> Option<io::Result<()>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = async {
            let mut guard = writer.lock().await;
            let out = guard
                .as_mut()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;
            out.write_all(bytes).await?;
            out.flush().await
        } => Some(result),
    }
}
