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

//! Radio permission checks.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A capability the process must hold before the listener may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RadioDiscover,
    RadioConnect,
    RadioAdvertise,
    CoarseLocation,
    FineLocation,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RadioDiscover => "radio_discover",
            Capability::RadioConnect => "radio_connect",
            Capability::RadioAdvertise => "radio_advertise",
            Capability::CoarseLocation => "coarse_location",
            Capability::FineLocation => "fine_location",
        }
    }
}

const RADIO_CAPABILITIES: &[Capability] = &[
    Capability::RadioDiscover,
    Capability::RadioConnect,
    Capability::RadioAdvertise,
];

const RADIO_AND_LOCATION_CAPABILITIES: &[Capability] = &[
    Capability::RadioDiscover,
    Capability::RadioConnect,
    Capability::RadioAdvertise,
    Capability::CoarseLocation,
    Capability::FineLocation,
];

/// Capabilities required to serve. Location is only needed where the
/// platform ties it to radio scanning.
pub fn required_capabilities(location_coupled: bool) -> &'static [Capability] {
    if location_coupled {
        RADIO_AND_LOCATION_CAPABILITIES
    } else {
        RADIO_CAPABILITIES
    }
}

/// Permission source supplied by the host platform.
pub trait Authorization: Send + Sync {
    /// Whether a single capability is currently granted.
    fn is_granted(&self, capability: Capability) -> bool;

    /// The fixed set this platform requires.
    fn required(&self) -> &'static [Capability];

    /// Required capabilities that are not granted.
    fn missing(&self) -> Vec<Capability> {
        self.required()
            .iter()
            .copied()
            .filter(|c| !self.is_granted(*c))
            .collect()
    }

    fn has_required_grants(&self) -> bool {
        self.required().iter().all(|c| self.is_granted(*c))
    }
}

/// Static set of grants, typically read from configuration.
#[derive(Debug, Clone)]
pub struct GrantSet {
    granted: HashSet<Capability>,
    location_coupled: bool,
}

impl GrantSet {
    pub fn new(granted: impl IntoIterator<Item = Capability>, location_coupled: bool) -> Self {
        Self {
            granted: granted.into_iter().collect(),
            location_coupled,
        }
    }

    /// Every capability granted.
    pub fn all() -> Self {
        Self::new(RADIO_AND_LOCATION_CAPABILITIES.iter().copied(), false)
    }

    /// Revoke a capability, e.g. after the user withdrew it.
    pub fn revoke(&mut self, capability: Capability) {
        self.granted.remove(&capability);
    }
}

impl Authorization for GrantSet {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    fn required(&self) -> &'static [Capability] {
        required_capabilities(self.location_coupled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_grants_satisfy() {
        let grants = GrantSet::all();
        assert!(grants.has_required_grants());
        assert!(grants.missing().is_empty());
    }

    #[test]
    fn test_location_only_required_when_coupled() {
        let radio_only = [
            Capability::RadioDiscover,
            Capability::RadioConnect,
            Capability::RadioAdvertise,
        ];

        assert!(GrantSet::new(radio_only, false).has_required_grants());

        let coupled = GrantSet::new(radio_only, true);
        assert!(!coupled.has_required_grants());
        assert_eq!(
            coupled.missing(),
            vec![Capability::CoarseLocation, Capability::FineLocation]
        );
    }

    #[test]
    fn test_revoked_capability() {
        let mut grants = GrantSet::all();
        grants.revoke(Capability::RadioConnect);
        assert!(!grants.has_required_grants());
        assert_eq!(grants.missing(), vec![Capability::RadioConnect]);
    }
}
