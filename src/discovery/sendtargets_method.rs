// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The SendTargets discovery method: probes every persisted discovery
//! address, growing the response buffer and retrying exactly once when the
//! server reports more entries than fit.

use std::sync::Arc;

use crate::{
    error::{DiscoveryError, Result},
    hba::Hba,
    isns::ingest_portal_list,
    model::{address::DiscoveryAddress, method::DiscoveryMethod},
    sendtargets::SendTargetsOutcome,
};

pub async fn run_cycle(hba: &Arc<Hba>) -> Result<()> {
    for addr in hba.store.discovery_addrs().await? {
        if let Err(e) = probe_one(hba, addr).await {
            tracing::warn!(discovery_addr = ?addr, error = %e, "skipping address");
        }
    }
    Ok(())
}

/// Probes a single discovery address, retrying once on overflow. Used both
/// by the periodic cycle above (one address at a time, errors logged and
/// swallowed so one bad address doesn't stop the others) and by the
/// administrative `do_sendtgts` control-surface entry point (one address on
/// demand, errors propagated to the caller).
pub async fn probe_one(hba: &Arc<Hba>, addr: DiscoveryAddress) -> Result<()> {
    let _permit = hba
        .sendtargets_semaphore
        .acquire()
        .await
        .expect("sendtargets semaphore is never closed");

    let capacity = hba.runtime.sendtargets_initial_capacity;
    match hba.sendtargets_client.get(addr, capacity).await? {
        SendTargetsOutcome::Entries(entries) => {
            ingest_portal_list(&hba.registry, DiscoveryMethod::SendTargets, addr, entries).await;
            Ok(())
        },
        SendTargetsOutcome::Overflow { returned } => {
            match hba.sendtargets_client.get(addr, returned).await? {
                SendTargetsOutcome::Entries(entries) => {
                    ingest_portal_list(&hba.registry, DiscoveryMethod::SendTargets, addr, entries)
                        .await;
                    Ok(())
                },
                SendTargetsOutcome::Overflow { returned } => {
                    Err(DiscoveryError::Overflow { capacity: returned })
                },
            }
        },
    }
}
