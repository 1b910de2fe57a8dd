// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Data types owned by the session registry (component C): the composite
//! [`SessionKey`], the [`Session`] entity itself, and the small
//! [`ConfiguredSessions`] record that controls how many `isid`s a target
//! fans out to.

use std::sync::Arc;

use crate::{model::address::DiscoveryAddress, model::method::DiscoveryMethod};

/// A target name. Constrained to the iSCSI name length bound; this
/// implementation treats that bound as 223 bytes, matching how tests probe
/// it, but does not otherwise interpret the name.
pub type TargetName = Arc<str>;

pub const MAX_TARGET_NAME_LEN: usize = 223;

/// The composite identity of a session: which target, discovered by which
/// method at which discovery address, for which session index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub target_name: TargetName,
    pub discovery_method: DiscoveryMethod,
    pub discovered_addr: DiscoveryAddress,
    pub isid: u32,
}

/// The session's transport-visible lifecycle state. Everything beyond
/// "online" vs. "destroyable" is opaque to the core and owned by the
/// transport engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Normal,
}

/// An entity owned by the registry. At most one `Session` exists per
/// `SessionKey` (enforced by the registry, not by this type).
#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    /// TPGT the target reported alongside this discovery.
    pub tpgt: u16,
    /// The target-side address of the active connection.
    pub target_addr: DiscoveryAddress,
    pub state: SessionState,
    /// Opaque handle into the transport engine's own session table.
    pub transport_handle: crate::transport::SessionHandle,
}

impl Session {
    pub fn discovered_by(&self) -> DiscoveryMethod {
        self.key.discovery_method
    }
}

/// `(count, bound)` resolved by consulting, in order: the per-target record,
/// else the per-initiator record, else the default `(1, true)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredSessions {
    pub count: u32,
    pub bound: bool,
}

impl ConfiguredSessions {
    pub const DEFAULT: ConfiguredSessions = ConfiguredSessions {
        count: 1,
        bound: true,
    };

    /// Resolves `(per_target, per_initiator)` down to the default per the
    /// fallback order in §3.
    pub fn resolve(
        per_target: Option<ConfiguredSessions>,
        per_initiator: Option<ConfiguredSessions>,
    ) -> ConfiguredSessions {
        per_target
            .or(per_initiator)
            .unwrap_or(ConfiguredSessions::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_per_target() {
        let target = ConfiguredSessions {
            count: 4,
            bound: false,
        };
        let initiator = ConfiguredSessions {
            count: 2,
            bound: true,
        };
        assert_eq!(
            ConfiguredSessions::resolve(Some(target), Some(initiator)),
            target
        );
    }

    #[test]
    fn resolve_falls_back_to_initiator_then_default() {
        let initiator = ConfiguredSessions {
            count: 2,
            bound: true,
        };
        assert_eq!(
            ConfiguredSessions::resolve(None, Some(initiator)),
            initiator
        );
        assert_eq!(
            ConfiguredSessions::resolve(None, None),
            ConfiguredSessions::DEFAULT
        );
    }
}
