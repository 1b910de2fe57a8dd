// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component G: the iSNS reaction path. Routes state-change notifications
//! pushed by the iSNS codec's callback through the same `registry.add` /
//! `registry.del` paths the iSNS worker's periodic cycle uses.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    hba::Hba,
    isns::{IsnsScnHandler, ScnEvent, ScnType, ingest_portal_list},
    model::method::DiscoveryMethod,
};

/// The SCN callback registered with the iSNS codec via `reg`.
pub struct IsnsReactionHandler {
    hba: Arc<Hba>,
}

impl IsnsReactionHandler {
    pub fn new(hba: Arc<Hba>) -> Arc<Self> {
        Arc::new(Self { hba })
    }
}

#[async_trait]
impl IsnsScnHandler for IsnsReactionHandler {
    async fn handle_scn(&self, event: ScnEvent) {
        match event.scn_type {
            ScnType::ObjAdded => {
                let entries = match self.hba.isns_codec.query_one_node(&event.source_key).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!(
                            source_key = %event.source_key,
                            error = %e,
                            "ObjAdded query_one_node failed"
                        );
                        return;
                    },
                };

                // A node-level SCN carries no discovery address of its own;
                // each portal entry supplies its own target address, so the
                // discovery address recorded on the session is the node's
                // iSNS-reported address (its first portal's).
                let discovery_addr = match entries.first() {
                    Some(entry) => entry.target_addr,
                    None => return,
                };

                ingest_portal_list(
                    &self.hba.registry,
                    DiscoveryMethod::Isns,
                    discovery_addr,
                    entries,
                )
                .await;

                self.hba
                    .registry
                    .login_targets(Some(&event.source_key), DiscoveryMethod::Isns, None)
                    .await;
            },
            ScnType::ObjRemoved => {
                if let Err(e) = self
                    .hba
                    .registry
                    .del(Some(&event.source_key), DiscoveryMethod::Isns, None)
                    .await
                {
                    tracing::warn!(
                        source_key = %event.source_key,
                        error = %e,
                        "ObjRemoved del failed"
                    );
                }
            },
            ScnType::ObjUpdated => {
                tracing::info!(source_key = %event.source_key, "iSNS object updated");
            },
            ScnType::Other(scn_type) => {
                tracing::info!(source_key = %event.source_key, scn_type, "unrecognized SCN type");
            },
        }
    }
}
