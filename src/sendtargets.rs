// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The SendTargets RPC: the external collaborator that returns a portal
//! list for a given discovery address. Out of scope for this crate —
//! consumed here only through [`SendTargetsClient`].

use async_trait::async_trait;

use crate::{
    error::Result,
    model::{address::DiscoveryAddress, session::TargetName},
};

/// One `(target_name, target_addr, tpgt)` tuple returned by a SendTargets
/// probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub target_name: TargetName,
    pub target_addr: DiscoveryAddress,
    pub tpgt: u16,
}

/// The result of one `ioctl_sendtgts_get`-style call: either the entries fit
/// in the requested capacity, or the server reports it has more than that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTargetsOutcome {
    Entries(Vec<TargetEntry>),
    /// The server reports `returned` entries, which exceeded the capacity
    /// the call was made with.
    Overflow { returned: usize },
}

#[async_trait]
pub trait SendTargetsClient: Send + Sync {
    /// Probes `addr` for up to `capacity` entries.
    async fn get(
        &self,
        addr: DiscoveryAddress,
        capacity: usize,
    ) -> Result<SendTargetsOutcome>;
}
