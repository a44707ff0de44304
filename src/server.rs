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

//! Echo server supervisor.
//!
//! Checks preconditions, starts the listener and runs the accept/echo task.
//! The returned [`ServerHandle`] is the only way to reach the running
//! components; there is no global "current listener" or "current session".

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bluetooth::{Listener, ListenerHandle, ServiceIdentity, Session, SessionHandle};
use crate::error::{Result, ServerError};
use crate::platform::{messages, Adapter, Authorization, Endpoint, Notifier};
use crate::state::{ServerState, ServerStatus};

/// Builds and starts the single-session echo server.
pub struct EchoServer<A: Adapter> {
    adapter: A,
    authorization: Box<dyn Authorization>,
    notifier: Arc<dyn Notifier>,
    identity: ServiceIdentity,
    power_on: bool,
    accept_timeout: Option<Duration>,
    state: Arc<ServerState>,
    // Set while a `ServerHandle` from this server is alive.
    running: Arc<AtomicBool>,
}

impl<A: Adapter> EchoServer<A> {
    pub fn new(
        adapter: A,
        authorization: impl Authorization + 'static,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            adapter,
            authorization: Box::new(authorization),
            notifier,
            identity: ServiceIdentity::serial_port(),
            power_on: false,
            accept_timeout: None,
            state: ServerState::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_identity(mut self, identity: ServiceIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Ask the adapter to power on when it is off.
    pub fn with_power_on(mut self, power_on: bool) -> Self {
        self.power_on = power_on;
        self
    }

    pub fn with_accept_timeout(mut self, limit: Option<Duration>) -> Self {
        self.accept_timeout = limit;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    /// Start listening and spawn the serving task.
    ///
    /// Precondition failures are returned before anything is spawned. Only one
    /// handle may be alive at a time; starting again before it is dropped
    /// fails with `AlreadyRunning` and leaves the running server untouched.
    pub async fn start(&self) -> Result<ServerHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Start requested while the server is already running");
            return Err(ServerError::AlreadyRunning);
        }

        if self.power_on && self.adapter.is_available().await && !self.adapter.is_enabled().await
        {
            info!("Requesting {} adapter power on", self.adapter.backend_name());
            if let Err(e) = self.adapter.request_enable().await {
                warn!("Enable request failed: {}", e);
            }
        }

        let shutdown = CancellationToken::new();
        let listener = match Listener::start(
            self.identity,
            &self.adapter,
            self.authorization.as_ref(),
            shutdown.child_token(),
        )
        .await
        {
            Ok(listener) => listener.with_accept_timeout(self.accept_timeout),
            Err(e) => {
                match &e {
                    ServerError::AdapterUnavailable => self.notifier.notify(messages::NOT_SUPPORTED),
                    ServerError::PermissionDenied => {
                        self.notifier.notify(messages::PERMISSIONS_DENIED)
                    }
                    _ => {}
                }
                self.state.set_error();
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };

        self.state.set_listening();
        self.notifier.notify(messages::SERVER_STARTED);

        let listener_handle = listener.handle();
        let session = Arc::new(Mutex::new(None));
        let task = tokio::spawn(serve(
            listener,
            shutdown.clone(),
            self.state.clone(),
            session.clone(),
        ));

        Ok(ServerHandle {
            shutdown,
            listener: listener_handle,
            session,
            task: Some(task),
            notifier: self.notifier.clone(),
            state: self.state.clone(),
            running: self.running.clone(),
            stopped: false,
        })
    }
}

/// Accept one peer, then echo for it until the connection ends.
async fn serve<E: Endpoint>(
    listener: Listener<E>,
    shutdown: CancellationToken,
    state: Arc<ServerState>,
    slot: Arc<Mutex<Option<SessionHandle>>>,
) {
    let connection = match listener.accept_once().await {
        Ok(connection) => connection,
        Err(e) => {
            if shutdown.is_cancelled() {
                info!("Listener stopped before a peer connected");
            } else {
                error!("Listener terminated: {}", e);
                state.set_error();
            }
            return;
        }
    };

    state.set_connected(connection.peer.clone());
    let session = Session::new(connection, shutdown.child_token());
    let handle = session.handle();
    info!("Serving echo session for {}", handle.peer());
    *slot.lock() = Some(handle);

    if let Err(e) = session.run().await {
        warn!("Session terminated: {}", e);
    }

    state.set_stopped();
}

/// Owned handle to a running server.
///
/// Dropping the handle cancels whatever component is still active.
pub struct ServerHandle {
    shutdown: CancellationToken,
    listener: ListenerHandle,
    session: Arc<Mutex<Option<SessionHandle>>>,
    task: Option<JoinHandle<()>>,
    notifier: Arc<dyn Notifier>,
    state: Arc<ServerState>,
    running: Arc<AtomicBool>,
    stopped: bool,
}

impl ServerHandle {
    pub fn listener(&self) -> &ListenerHandle {
        &self.listener
    }

    /// The session, once a peer has been accepted.
    pub fn session(&self) -> Option<SessionHandle> {
        self.session.lock().clone()
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    /// Whether the serving task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the serving task to exit on its own.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                error!("Server task failed: {}", e);
            }
            self.task = None;
        }
    }

    /// Cancel the active listener or session and wait for the task to exit.
    ///
    /// Calling this more than once, or after the task already finished, is fine.
    /// A failure recorded by the serving task stays visible as `Error`.
    pub async fn stop(&mut self) {
        if !self.listener.state().is_terminal() {
            info!("Stopping listener");
        } else if let Some(session) = self.session() {
            if !session.is_cancelled() {
                info!("Closing session with {}", session.peer());
            }
        }

        self.shutdown.cancel();
        self.wait().await;

        if !self.stopped {
            self.stopped = true;
            if self.state.get_status() != ServerStatus::Error {
                self.state.set_stopped();
            }
            self.notifier.notify(messages::SERVER_STOPPED);
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::ListenerState;
    use crate::platform::{Capability, ChannelNotifier, GrantSet};
    use crate::testing::MockAdapter;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn server(adapter: MockAdapter) -> (EchoServer<MockAdapter>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        let server = EchoServer::new(adapter, GrantSet::all(), Arc::new(ChannelNotifier::new(tx)));
        (server, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_disabled_adapter_starts_nothing() {
        let (server, mut rx) = server(MockAdapter::new().disabled());

        let result = server.start().await;
        assert!(matches!(result, Err(ServerError::AdapterDisabled)));
        assert_eq!(server.adapter().bind_count(), 0);
        assert_eq!(server.state().get_status(), ServerStatus::Error);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_power_on_enables_adapter() {
        let (server, mut rx) = server(MockAdapter::new().disabled());
        let server = server.with_power_on(true);

        let mut handle = server.start().await.unwrap();
        assert_eq!(handle.listener().state(), ListenerState::Listening);
        assert_eq!(drain(&mut rx), vec![messages::SERVER_STARTED]);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_refused_enable_is_adapter_disabled() {
        let (server, _rx) = server(MockAdapter::new().disabled().enable_refused());
        let server = server.with_power_on(true);

        assert!(matches!(server.start().await, Err(ServerError::AdapterDisabled)));
    }

    #[tokio::test]
    async fn test_unavailable_adapter_notifies() {
        let (server, mut rx) = server(MockAdapter::new().unavailable());

        assert!(matches!(server.start().await, Err(ServerError::AdapterUnavailable)));
        assert_eq!(drain(&mut rx), vec![messages::NOT_SUPPORTED]);
    }

    #[tokio::test]
    async fn test_permission_denied_notifies() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut grants = GrantSet::all();
        grants.revoke(Capability::RadioConnect);
        let server = EchoServer::new(MockAdapter::new(), grants, Arc::new(ChannelNotifier::new(tx)));

        assert!(matches!(server.start().await, Err(ServerError::PermissionDenied)));
        assert_eq!(server.adapter().bind_count(), 0);
        assert_eq!(drain(&mut rx), vec![messages::PERMISSIONS_DENIED]);
    }

    #[tokio::test]
    async fn test_ping_pong_then_disconnect() {
        let (server, mut rx) = server(MockAdapter::new());
        let mut handle = server.start().await.unwrap();
        assert_eq!(server.state().get_status(), ServerStatus::Listening);

        let mut peer = server.adapter().connect().await.unwrap();
        let mut buf = [0u8; 4];

        peer.write_all(b"ping").await.unwrap();
        timeout(Duration::from_secs(1), peer.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").await.unwrap();
        timeout(Duration::from_secs(1), peer.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"pong");

        assert_eq!(server.state().get_status(), ServerStatus::Connected);
        assert_eq!(server.state().get_peer().as_deref(), Some("mock-peer-1"));
        assert_eq!(handle.listener().state(), ListenerState::Accepted);

        // Single session: nobody else can connect.
        assert!(server.adapter().connect().await.is_err());

        drop(peer);
        timeout(Duration::from_secs(1), handle.wait()).await.unwrap();
        assert!(handle.is_finished());
        assert_eq!(server.state().get_status(), ServerStatus::Stopped);
        assert_eq!(handle.session().unwrap().bytes_echoed(), 8);

        handle.stop().await;
        assert_eq!(
            drain(&mut rx),
            vec![messages::SERVER_STARTED, messages::SERVER_STOPPED]
        );
    }

    #[tokio::test]
    async fn test_stop_before_accept() {
        let (server, mut rx) = server(MockAdapter::new());
        let mut handle = server.start().await.unwrap();

        timeout(Duration::from_secs(1), handle.stop()).await.unwrap();
        assert_eq!(handle.listener().state(), ListenerState::Cancelled);
        assert!(handle.session().is_none());
        assert!(server.adapter().endpoint_closed());

        // Second stop is a no-op.
        handle.stop().await;
        assert_eq!(
            drain(&mut rx),
            vec![messages::SERVER_STARTED, messages::SERVER_STOPPED]
        );
    }

    #[tokio::test]
    async fn test_stop_closes_active_session() {
        let (server, _rx) = server(MockAdapter::new());
        let mut handle = server.start().await.unwrap();

        let mut peer = server.adapter().connect().await.unwrap();
        peer.write_all(b"x").await.unwrap();
        let mut buf = [0u8; 1];
        timeout(Duration::from_secs(1), peer.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();

        timeout(Duration::from_secs(1), handle.stop()).await.unwrap();
        assert!(handle.session().unwrap().is_cancelled());

        let n = timeout(Duration::from_secs(1), peer.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_accept_timeout_marks_error() {
        let (server, _rx) = server(MockAdapter::new());
        let server = server.with_accept_timeout(Some(Duration::from_millis(20)));
        let mut handle = server.start().await.unwrap();

        timeout(Duration::from_secs(1), handle.wait()).await.unwrap();
        assert_eq!(handle.listener().state(), ListenerState::Failed);
        assert_eq!(server.state().get_status(), ServerStatus::Error);

        // Stopping afterwards keeps the failure visible.
        handle.stop().await;
        assert_eq!(server.state().get_status(), ServerStatus::Error);
    }

    #[tokio::test]
    async fn test_second_start_is_refused_while_running() {
        let (server, mut rx) = server(MockAdapter::new());
        let mut handle = server.start().await.unwrap();

        assert!(matches!(server.start().await, Err(ServerError::AlreadyRunning)));
        assert_eq!(server.adapter().bind_count(), 1);
        assert_eq!(server.state().get_status(), ServerStatus::Listening);
        assert_eq!(handle.listener().state(), ListenerState::Listening);

        // The first server still serves its peer.
        let mut peer = server.adapter().connect().await.unwrap();
        peer.write_all(b"a").await.unwrap();
        let mut buf = [0u8; 1];
        timeout(Duration::from_secs(1), peer.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"a");

        handle.stop().await;
        assert_eq!(
            drain(&mut rx),
            vec![messages::SERVER_STARTED, messages::SERVER_STOPPED]
        );
    }

    #[tokio::test]
    async fn test_restart_after_handle_dropped() {
        let (server, _rx) = server(MockAdapter::new());
        let mut handle = server.start().await.unwrap();
        handle.stop().await;
        drop(handle);

        let mut handle = server.start().await.unwrap();
        assert_eq!(handle.listener().state(), ListenerState::Listening);
        assert_eq!(server.adapter().bind_count(), 2);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_failed_start_allows_retry() {
        let (server, _rx) = server(MockAdapter::new().disabled());
        assert!(matches!(server.start().await, Err(ServerError::AdapterDisabled)));
        assert!(matches!(server.start().await, Err(ServerError::AdapterDisabled)));
    }
}
