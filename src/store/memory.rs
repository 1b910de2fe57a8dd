// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! An in-memory [`ConfigStore`] (component M). Used by the demo binary and
//! by every integration test in this crate — there is no real persistent
//! store to talk to in this workspace.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChapRecord, ConfigStore, PersistentParamRecord, StaticTargetEntry};
use crate::{
    error::Result,
    model::{
        address::DiscoveryAddress,
        method::MethodMask,
        session::{ConfiguredSessions, TargetName},
    },
};

/// Each logical section gets its own lock, matching the locking discipline
/// §5 describes for the real store (independent sections, each locked for
/// the duration of its own walk).
#[derive(Default)]
pub struct MemoryStore {
    disc_meth: RwLock<MethodMask>,
    initiator_name: RwLock<Option<String>>,
    alias_name: RwLock<Option<String>>,
    chap: RwLock<Option<ChapRecord>>,
    initiator_params: RwLock<PersistentParamRecord>,
    target_params: RwLock<HashMap<TargetName, PersistentParamRecord>>,
    static_targets: RwLock<Vec<StaticTargetEntry>>,
    discovery_addrs: RwLock<Vec<DiscoveryAddress>>,
    isns_servers: RwLock<Vec<DiscoveryAddress>>,
    config_sessions: RwLock<HashMap<TargetName, ConfiguredSessions>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/demo helper: seed the enabled-method bitmap.
    pub async fn set_disc_meth(&self, mask: MethodMask) {
        *self.disc_meth.write().await = mask;
    }

    /// Test/demo helper: seed the static target list.
    pub async fn set_static_targets(&self, entries: Vec<StaticTargetEntry>) {
        *self.static_targets.write().await = entries;
    }

    /// Test/demo helper: seed the SendTargets discovery-address list.
    pub async fn set_discovery_addrs(&self, addrs: Vec<DiscoveryAddress>) {
        *self.discovery_addrs.write().await = addrs;
    }

    /// Test/demo helper: seed the iSNS server list.
    pub async fn set_isns_servers(&self, addrs: Vec<DiscoveryAddress>) {
        *self.isns_servers.write().await = addrs;
    }

    /// Test/demo helper: seed a per-target configured-sessions override.
    pub async fn set_config_session(&self, name: TargetName, cfg: ConfiguredSessions) {
        self.config_sessions.write().await.insert(name, cfg);
    }

    /// Test/demo helper: seed a per-target parameter override record.
    pub async fn set_target_param(&self, name: TargetName, record: PersistentParamRecord) {
        self.target_params.write().await.insert(name, record);
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn init(&self, _restart: bool) -> Result<bool> {
        Ok(true)
    }

    async fn disc_meth_get(&self) -> Result<MethodMask> {
        Ok(*self.disc_meth.read().await)
    }

    async fn initiator_name_get(&self) -> Result<Option<String>> {
        Ok(self.initiator_name.read().await.clone())
    }

    async fn initiator_name_set(&self, name: String) -> Result<()> {
        *self.initiator_name.write().await = Some(name);
        Ok(())
    }

    async fn alias_name_get(&self) -> Result<Option<String>> {
        Ok(self.alias_name.read().await.clone())
    }

    async fn alias_name_set(&self, alias: String) -> Result<()> {
        *self.alias_name.write().await = Some(alias);
        Ok(())
    }

    async fn chap_get(&self) -> Result<Option<ChapRecord>> {
        Ok(self.chap.read().await.clone())
    }

    async fn chap_set(&self, record: ChapRecord) -> Result<()> {
        *self.chap.write().await = Some(record);
        Ok(())
    }

    async fn initiator_params(&self) -> Result<PersistentParamRecord> {
        Ok(self.initiator_params.read().await.clone())
    }

    async fn target_params(&self) -> Result<Vec<(TargetName, PersistentParamRecord)>> {
        Ok(self
            .target_params
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn target_param_get(
        &self,
        name: &TargetName,
    ) -> Result<Option<PersistentParamRecord>> {
        Ok(self.target_params.read().await.get(name).cloned())
    }

    async fn remove_target_param(&self, name: &TargetName) -> Result<()> {
        self.target_params.write().await.remove(name);
        Ok(())
    }

    async fn static_targets(&self) -> Result<Vec<StaticTargetEntry>> {
        Ok(self.static_targets.read().await.clone())
    }

    async fn discovery_addrs(&self) -> Result<Vec<DiscoveryAddress>> {
        Ok(self.discovery_addrs.read().await.clone())
    }

    async fn isns_servers(&self) -> Result<Vec<DiscoveryAddress>> {
        Ok(self.isns_servers.read().await.clone())
    }

    async fn get_config_session(
        &self,
        name: &TargetName,
    ) -> Result<Option<ConfiguredSessions>> {
        Ok(self.config_sessions.read().await.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::address::normalize;

    #[tokio::test]
    async fn seeded_static_targets_round_trip() {
        let store = MemoryStore::new();
        let addr = normalize(&[192, 0, 2, 5], 3260, 1).expect("valid address");
        store
            .set_static_targets(vec![StaticTargetEntry {
                name: Arc::from("iqn.test:disk0"),
                addr,
            }])
            .await;

        let got = store.static_targets().await.expect("store available");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].addr, addr);
    }

    #[tokio::test]
    async fn config_session_defaults_to_none() {
        let store = MemoryStore::new();
        let name: TargetName = Arc::from("iqn.test:disk0");
        assert_eq!(store.get_config_session(&name).await.unwrap(), None);
    }
}
