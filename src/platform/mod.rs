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

//! Host platform collaborators.
//!
//! The echo core only talks to the radio, the permission model and the
//! user-facing status sink through these traits.

mod adapter;
mod authorization;
mod notify;

pub use adapter::{Adapter, Endpoint};
pub use authorization::{required_capabilities, Authorization, Capability, GrantSet};
pub use notify::{messages, ChannelNotifier, LogNotifier, Notifier};
