// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The iSNS protocol codec: the external collaborator performing query,
//! register, deregister and SCN callback dispatch. Out of scope for this
//! crate — consumed here only through [`IsnsCodec`] and [`IsnsScnHandler`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::Result, model::session::TargetName, registry::SessionRegistry, sendtargets::TargetEntry};

/// The kind of state-change notification an iSNS server pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScnType {
    ObjAdded,
    ObjRemoved,
    ObjUpdated,
    /// Any other numeric SCN type the codec does not interpret.
    Other(u32),
}

/// One state-change notification, as delivered by the codec's callback
/// thread.
#[derive(Debug, Clone)]
pub struct ScnEvent {
    pub scn_type: ScnType,
    pub source_key: TargetName,
}

/// The callback the core registers with the iSNS service via `reg`.
/// Invoked asynchronously, on whatever thread the codec selects, whenever an
/// SCN arrives.
#[async_trait]
pub trait IsnsScnHandler: Send + Sync {
    async fn handle_scn(&self, event: ScnEvent);
}

/// The iSNS codec consumed by the discovery core.
#[async_trait]
pub trait IsnsCodec: Send + Sync {
    /// (Re-)registers the initiator, supplying the SCN callback. Idempotent
    /// by protocol — calling it again with the initiator already registered
    /// is not an error.
    async fn reg(&self, callback: Arc<dyn IsnsScnHandler>) -> Result<()>;

    /// Deregisters the initiator. Called once on worker stop.
    async fn dereg(&self) -> Result<()>;

    /// Bulk query across every node the iSNS server knows about.
    async fn query(&self) -> Result<Vec<TargetEntry>>;

    /// Bulk query scoped to one iSNS server (distinct RPC from `query`, but
    /// the same post-processing applies to its result). Called once per
    /// configured server by the periodic worker cycle, so each server's
    /// results can be attributed to that server's own address.
    async fn query_one_server(&self) -> Result<Vec<TargetEntry>>;

    /// Query a single node by its iSNS key, used by the `ObjAdded` reaction.
    async fn query_one_node(&self, source_key: &TargetName) -> Result<Vec<TargetEntry>>;
}

/// Walks a portal list returned by any of the iSNS query flavors (or by
/// SendTargets) and funnels each entry through `registry.add`, logging and
/// continuing past any single target's failure.
///
/// Factored out once because `query` and `query_one_server` share this exact
/// post-processing (see Design Notes: "Dual queries in iSNS").
pub async fn ingest_portal_list(
    registry: &SessionRegistry,
    method: crate::model::method::DiscoveryMethod,
    discovery_addr: crate::model::address::DiscoveryAddress,
    entries: Vec<TargetEntry>,
) {
    for entry in entries {
        if let Err(e) = registry
            .add(
                method,
                discovery_addr,
                entry.target_name.clone(),
                entry.tpgt,
                entry.target_addr,
            )
            .await
        {
            tracing::warn!(
                target_name = %entry.target_name,
                error = %e,
                "failed to add session for discovered target, continuing"
            );
        }
    }
}
