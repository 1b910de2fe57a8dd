// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Discovery method identity and the enabled/disabled bit-set over methods.

use std::fmt;

use bitflags::bitflags;

/// One of the four discovery methods, plus the `Unknown` sentinel used by
/// matching code (`del`, `login_targets`) to mean "any method".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryMethod {
    Static,
    SendTargets,
    Isns,
    Slp,
    /// Matches every session regardless of its discovery provenance. Never
    /// assigned as a session's `discovered_by`.
    Unknown,
}

impl DiscoveryMethod {
    /// All four real methods, in the fixed order the event barrier and the
    /// worker table use.
    pub const ALL: [DiscoveryMethod; 4] = [
        DiscoveryMethod::Static,
        DiscoveryMethod::SendTargets,
        DiscoveryMethod::Isns,
        DiscoveryMethod::Slp,
    ];

    /// The corresponding single-bit mask, or `None` for `Unknown` (which is
    /// not a bit in the enabled/disabled bitmap).
    pub fn bit(self) -> Option<MethodMask> {
        match self {
            DiscoveryMethod::Static => Some(MethodMask::STATIC),
            DiscoveryMethod::SendTargets => Some(MethodMask::SEND_TARGETS),
            DiscoveryMethod::Isns => Some(MethodMask::ISNS),
            DiscoveryMethod::Slp => Some(MethodMask::SLP),
            DiscoveryMethod::Unknown => None,
        }
    }

    /// Whether `self` matches `other` under the `Unknown`-as-wildcard
    /// algebra used throughout the registry (`del`, `login_targets`).
    pub fn matches(self, other: DiscoveryMethod) -> bool {
        matches!(self, DiscoveryMethod::Unknown) || self == other
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscoveryMethod::Static => "Static",
            DiscoveryMethod::SendTargets => "SendTargets",
            DiscoveryMethod::Isns => "iSNS",
            DiscoveryMethod::Slp => "SLP",
            DiscoveryMethod::Unknown => "Unknown",
        })
    }
}

bitflags! {
    /// The enabled/disabled bit-set over the four real methods. `disable`
    /// is always called with the complement of the currently-enabled set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodMask: u8 {
        const STATIC       = 0b0001;
        const SEND_TARGETS = 0b0010;
        const ISNS         = 0b0100;
        const SLP          = 0b1000;
    }
}

impl MethodMask {
    /// The mask containing every real method's bit.
    pub fn all_methods() -> MethodMask {
        MethodMask::STATIC | MethodMask::SEND_TARGETS | MethodMask::ISNS | MethodMask::SLP
    }

    /// Iterate the methods set in this mask, in `DiscoveryMethod::ALL` order.
    pub fn iter_methods(self) -> impl Iterator<Item = DiscoveryMethod> {
        DiscoveryMethod::ALL
            .into_iter()
            .filter(move |m| m.bit().is_some_and(|b| self.contains(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_matches_every_method() {
        for m in DiscoveryMethod::ALL {
            assert!(DiscoveryMethod::Unknown.matches(m));
        }
    }

    #[test]
    fn real_method_matches_only_itself() {
        assert!(DiscoveryMethod::Static.matches(DiscoveryMethod::Static));
        assert!(!DiscoveryMethod::Static.matches(DiscoveryMethod::SendTargets));
    }

    #[test]
    fn disable_mask_is_complement_of_enabled() {
        let enabled = MethodMask::STATIC | MethodMask::ISNS;
        let disabled = MethodMask::all_methods().difference(enabled);
        assert_eq!(disabled, MethodMask::SEND_TARGETS | MethodMask::SLP);
    }
}
