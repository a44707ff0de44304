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

//! One-shot RFCOMM listener.
//!
//! A listener advertises the service, accepts a single peer and then closes
//! its server endpoint. Only one peer can ever connect per listener.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::identity::ServiceIdentity;
use crate::error::{Result, ServerError};
use crate::platform::{Adapter, Authorization, Endpoint};

/// Lifecycle of a listener. `Accepted`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Created,
    Listening,
    Accepted,
    Cancelled,
    Failed,
}

impl ListenerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListenerState::Accepted | ListenerState::Cancelled | ListenerState::Failed
        )
    }
}

/// An accepted connection, handed from the listener to a session.
#[derive(Debug)]
pub struct Connection<S> {
    pub stream: S,
    pub peer: String,
}

/// Cancels a listener from another task and observes its state.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    cancel: CancellationToken,
    state: Arc<Mutex<ListenerState>>,
}

impl ListenerHandle {
    /// Close the server endpoint. Safe to call repeatedly or after the listener retired.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Listener cancel requested");
        }
        self.cancel.cancel();
    }

    pub fn state(&self) -> ListenerState {
        *self.state.lock()
    }

    fn set_state(&self, state: ListenerState) {
        *self.state.lock() = state;
    }
}

/// Bound and advertised server endpoint awaiting its single peer.
pub struct Listener<E: Endpoint> {
    endpoint: Option<E>,
    identity: ServiceIdentity,
    handle: ListenerHandle,
    accept_timeout: Option<Duration>,
}

impl<E: Endpoint> Listener<E> {
    /// Check preconditions, then bind and advertise `identity`.
    ///
    /// Nothing is bound unless the adapter is present, powered and authorized.
    pub async fn start<A>(
        identity: ServiceIdentity,
        adapter: &A,
        authorization: &dyn Authorization,
        cancel: CancellationToken,
    ) -> Result<Self>
    where
        A: Adapter<Endpoint = E>,
    {
        let handle = ListenerHandle {
            cancel,
            state: Arc::new(Mutex::new(ListenerState::Created)),
        };

        if !adapter.is_available().await {
            warn!("No {} adapter available", adapter.backend_name());
            return Err(ServerError::AdapterUnavailable);
        }

        if !adapter.is_enabled().await {
            warn!("{} adapter is powered off", adapter.backend_name());
            return Err(ServerError::AdapterDisabled);
        }

        if !authorization.has_required_grants() {
            let missing: Vec<&str> = authorization.missing().iter().map(|c| c.as_str()).collect();
            warn!("Missing Bluetooth permissions: {}", missing.join(", "));
            return Err(ServerError::PermissionDenied);
        }

        let endpoint = adapter.bind(&identity).await.map_err(|e| {
            error!("Socket's listen() failed for {}: {}", identity, e);
            ServerError::ListenFailure(e)
        })?;

        handle.set_state(ListenerState::Listening);
        info!("Listening for {} via {}", identity, adapter.backend_name());

        Ok(Self {
            endpoint: Some(endpoint),
            identity,
            handle,
            accept_timeout: None,
        })
    }

    /// Give up on accepting after `limit`.
    pub fn with_accept_timeout(mut self, limit: Option<Duration>) -> Self {
        self.accept_timeout = limit;
        self
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ListenerState {
        self.handle.state()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait for exactly one peer.
    ///
    /// The server endpoint is closed before this returns, whatever the outcome.
    pub async fn accept_once(mut self) -> Result<Connection<E::Stream>> {
        let mut endpoint = match self.endpoint.take() {
            Some(endpoint) => endpoint,
            None => {
                self.handle.set_state(ListenerState::Failed);
                return Err(ServerError::AcceptFailure(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "server endpoint already closed",
                )));
            }
        };

        info!("Waiting for a connection...");

        let accept_timeout = self.accept_timeout;
        let accept = async {
            match accept_timeout {
                Some(limit) => tokio::time::timeout(limit, endpoint.accept())
                    .await
                    .unwrap_or_else(|_| {
                        Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "no peer connected before the accept deadline",
                        ))
                    }),
                None => endpoint.accept().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = self.handle.cancel.cancelled() => None,
            result = accept => Some(result),
        };

        // Single session per listener: stop advertising as soon as accept returns.
        drop(endpoint);

        match outcome {
            Some(Ok((stream, peer))) => {
                self.handle.set_state(ListenerState::Accepted);
                info!("Connection accepted from {}; server endpoint closed", peer);
                Ok(Connection { stream, peer })
            }
            Some(Err(e)) => {
                self.handle.set_state(ListenerState::Failed);
                error!("Socket's accept() failed for {}: {}", self.identity, e);
                Err(ServerError::AcceptFailure(e))
            }
            None => {
                self.handle.set_state(ListenerState::Cancelled);
                info!("Listener cancelled before a peer connected");
                Err(ServerError::AcceptFailure(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "listener cancelled",
                )))
            }
        }
    }
}

impl<E: Endpoint> Drop for Listener<E> {
    fn drop(&mut self) {
        if self.endpoint.take().is_some() {
            self.handle.set_state(ListenerState::Cancelled);
            debug!("Listener dropped without accepting; server endpoint closed");
        }
    }
}
