// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The transport engine: the external collaborator that performs the actual
//! iSCSI login PDU exchange and session I/O. Out of scope for this crate —
//! consumed here only through [`TransportEngine`].

use async_trait::async_trait;

use crate::{
    error::Result,
    model::{
        address::DiscoveryAddress,
        method::DiscoveryMethod,
        params::SetRequest,
        session::{SessionState, TargetName},
    },
};

/// Opaque handle into the transport engine's own session table. The core
/// never interprets its contents, only threads it back through
/// `conn_create`, `sess_destroy` and `sess_online`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// Opaque handle into the transport engine's connection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(pub u64);

/// The transport engine consumed by the discovery core. A production
/// implementation drives real TCP dial, PDU framing and the CHAP handshake;
/// this crate only needs the narrow surface below.
#[async_trait]
pub trait TransportEngine: Send + Sync {
    /// Applies a projected login parameter to a not-yet-logged-in session.
    async fn set_params(&self, req: SetRequest) -> Result<()>;

    /// Creates (or returns the existing) session for
    /// `(method, discovered_addr, target_name, tpgt, isid)`.
    async fn sess_create(
        &self,
        method: DiscoveryMethod,
        discovered_addr: DiscoveryAddress,
        target_name: TargetName,
        tpgt: u16,
        isid: u32,
        state: SessionState,
    ) -> Result<SessionHandle>;

    /// Creates (or returns the existing) connection to `target_addr` under
    /// `session`.
    async fn conn_create(
        &self,
        target_addr: DiscoveryAddress,
        session: SessionHandle,
    ) -> Result<ConnHandle>;

    /// Destroys `session`. Fails with [`crate::error::DiscoveryError::SessionBusy`]
    /// if the transport engine refuses (e.g. outstanding I/O).
    async fn sess_destroy(&self, session: SessionHandle) -> Result<()>;

    /// Requests the transport engine bring `session` online (log in).
    async fn sess_online(&self, session: SessionHandle) -> Result<()>;
}
