// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The Static discovery method: registers every persisted static target
//! directly, since discovery and target address coincide for Static.

use std::sync::Arc;

use crate::{error::Result, hba::Hba, model::method::DiscoveryMethod};

pub async fn run_cycle(hba: &Arc<Hba>) -> Result<()> {
    for entry in hba.store.static_targets().await? {
        if let Err(e) = hba
            .registry
            .add(
                DiscoveryMethod::Static,
                entry.addr,
                entry.name.clone(),
                entry.addr.tpgt(),
                entry.addr,
            )
            .await
        {
            tracing::warn!(
                target_name = %entry.name,
                error = %e,
                "failed to add static session, continuing"
            );
        }
    }
    Ok(())
}
