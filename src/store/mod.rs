// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The persistent configuration store: initiator identity, per-target
//! parameter overrides, the static target list, the discovery-address list
//! and CHAP secrets. Out of scope for this crate — consumed here only
//! through [`ConfigStore`].
//!
//! The C-ism lock/cursor pairs named in the external interface (§6) are
//! expressed here as single async methods that hand back an
//! already-collected snapshot; the locking discipline (each section locked
//! for the duration of the walk) is an implementation detail of whatever
//! backs the trait, not part of its signature.

pub mod memory;

use async_trait::async_trait;

use crate::{
    error::Result,
    model::{
        address::DiscoveryAddress,
        method::MethodMask,
        params::LoginParams,
        session::{ConfiguredSessions, TargetName},
    },
};

/// A statically-configured target: its name and its one, fixed address
/// (discovery and target address coincide for Static).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTargetEntry {
    pub name: TargetName,
    pub addr: DiscoveryAddress,
}

/// CHAP credentials seeded at bootstrap (component H) and consulted by the
/// transport engine during login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapRecord {
    pub user: String,
    pub secret: String,
}

/// A per-target parameter override: which catalogued parameters this target
/// overrides, plus the values to use when overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentParamRecord {
    pub overridden: Vec<crate::model::params::ParamId>,
    pub values: LoginParams,
}

impl Default for PersistentParamRecord {
    fn default() -> Self {
        PersistentParamRecord {
            overridden: Vec::new(),
            values: LoginParams {
                header_digest: crate::model::params::Digest::None,
                data_digest: crate::model::params::Digest::None,
                data_pdu_in_order: true,
                data_sequence_in_order: true,
                error_recovery_level: 0,
                first_burst_length: 65536,
                max_burst_length: 262144,
                max_recv_data_segment_length: 65536,
                immediate_data: true,
                initial_r2t: true,
                max_outstanding_r2t: 1,
                max_connections: 1,
                default_time2retain: 20,
                default_time2wait: 2,
            },
        }
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Loads (or reloads, when `restart` is true) the store's backing data.
    async fn init(&self, restart: bool) -> Result<bool>;

    /// The currently-enabled discovery methods.
    async fn disc_meth_get(&self) -> Result<MethodMask>;

    async fn initiator_name_get(&self) -> Result<Option<String>>;
    async fn initiator_name_set(&self, name: String) -> Result<()>;

    async fn alias_name_get(&self) -> Result<Option<String>>;
    async fn alias_name_set(&self, alias: String) -> Result<()>;

    async fn chap_get(&self) -> Result<Option<ChapRecord>>;
    async fn chap_set(&self, record: ChapRecord) -> Result<()>;

    /// Every overridden per-initiator login parameter.
    async fn initiator_params(&self) -> Result<PersistentParamRecord>;

    /// Every target that has a per-target parameter override, by name.
    async fn target_params(&self) -> Result<Vec<(TargetName, PersistentParamRecord)>>;
    async fn target_param_get(
        &self,
        name: &TargetName,
    ) -> Result<Option<PersistentParamRecord>>;
    /// Removes a target's parameter override record, if one exists. A no-op
    /// if there is none — used to clean up orphans after a successful
    /// session destroy.
    async fn remove_target_param(&self, name: &TargetName) -> Result<()>;

    async fn static_targets(&self) -> Result<Vec<StaticTargetEntry>>;

    /// Discovery addresses the SendTargets worker probes.
    async fn discovery_addrs(&self) -> Result<Vec<DiscoveryAddress>>;

    /// iSNS server addresses the iSNS worker queries.
    async fn isns_servers(&self) -> Result<Vec<DiscoveryAddress>>;

    /// Per-target configured-sessions override, if one exists.
    async fn get_config_session(
        &self,
        name: &TargetName,
    ) -> Result<Option<ConfiguredSessions>>;
}
