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

//! Radio adapter abstraction.

use anyhow::Result;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::bluetooth::ServiceIdentity;

/// A bound and advertised server endpoint.
///
/// Dropping the endpoint closes it and withdraws the advertisement.
#[async_trait]
pub trait Endpoint: Send + 'static {
    /// Connected byte stream produced by [`Endpoint::accept`].
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for one inbound connection. Returns the stream and a peer label.
    async fn accept(&mut self) -> io::Result<(Self::Stream, String)>;
}

/// Radio adapter supplied by the host platform.
#[async_trait]
pub trait Adapter: Send + Sync {
    type Endpoint: Endpoint;

    /// Backend name for logging (e.g. "BlueZ").
    fn backend_name(&self) -> &'static str;

    /// Whether an adapter is present at all.
    async fn is_available(&self) -> bool;

    /// Whether the adapter is powered on.
    async fn is_enabled(&self) -> bool;

    /// Ask for the adapter to be powered on.
    async fn request_enable(&self) -> Result<()>;

    /// Bind a server endpoint and advertise it under `identity`.
    async fn bind(&self, identity: &ServiceIdentity) -> io::Result<Self::Endpoint>;
}
