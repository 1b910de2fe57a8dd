// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component H: initiator identity bootstrap. Generates a default
//! initiator name and alias on first boot and seeds an empty CHAP record.
//!
//! Reading the local NIC's MAC address and the machine's hostname are
//! themselves host facts this crate treats the same way it treats the
//! persistent store or the transport engine: supplied by the caller rather
//! than probed directly, since "read the first NIC's MAC" has no portable
//! meaning inside this crate's test harness.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    error::Result,
    store::{ChapRecord, ConfigStore},
};

/// The host facts identity bootstrap needs but cannot itself determine:
/// the primary NIC's MAC address and the local hostname.
#[derive(Debug, Clone, Copy)]
pub struct HostFacts<'a> {
    pub mac: [u8; 6],
    pub hostname: &'a str,
}

/// Builds the default initiator name `iqn.1986-03.com.sun:01:<mac-hex>.<time-hex>`.
fn default_initiator_name(mac: [u8; 6], unix_secs: u64) -> String {
    let mac_hex = mac.iter().map(|b| format!("{b:02x}")).collect::<String>();
    format!("iqn.1986-03.com.sun:01:{mac_hex}.{unix_secs:x}")
}

/// Seeds initiator name, alias and CHAP record in `store` if they are not
/// already set. Idempotent: a second call against an already-seeded store
/// is a no-op.
pub async fn bootstrap(store: &dyn ConfigStore, facts: HostFacts<'_>) -> Result<()> {
    if store.initiator_name_get().await?.is_none() {
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = default_initiator_name(facts.mac, unix_secs);
        store.initiator_name_set(name).await?;
    }

    let alias = store.alias_name_get().await?;
    if alias.as_deref().unwrap_or("").is_empty() {
        store.alias_name_set(facts.hostname.to_string()).await?;
    }

    if store.chap_get().await?.is_none() {
        let user = store
            .initiator_name_get()
            .await?
            .unwrap_or_else(|| facts.hostname.to_string());
        store
            .chap_set(ChapRecord {
                user,
                secret: String::new(),
            })
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn default_name_is_stable_given_inputs() {
        let name = default_initiator_name([0x00, 0x11, 0x22, 0x33, 0x44, 0x55], 0x1234);
        assert_eq!(name, "iqn.1986-03.com.sun:01:001122334455.1234");
    }

    #[tokio::test]
    async fn bootstrap_seeds_name_alias_and_chap_once() {
        let store = MemoryStore::new();
        let facts = HostFacts {
            mac: [1, 2, 3, 4, 5, 6],
            hostname: "initiator-host",
        };

        bootstrap(&store, facts).await.expect("bootstrap succeeds");
        let name = store
            .initiator_name_get()
            .await
            .expect("store available")
            .expect("name seeded");
        assert!(name.starts_with("iqn.1986-03.com.sun:01:010203040506."));
        assert_eq!(
            store.alias_name_get().await.unwrap().as_deref(),
            Some("initiator-host")
        );
        let chap = store
            .chap_get()
            .await
            .expect("store available")
            .expect("chap seeded");
        assert_eq!(chap.user, name);
        assert_eq!(chap.secret, "");

        // Second bootstrap must not clobber the now-set fields.
        store
            .alias_name_set("renamed".to_string())
            .await
            .expect("set alias");
        bootstrap(&store, facts).await.expect("bootstrap is idempotent");
        assert_eq!(
            store.alias_name_get().await.unwrap().as_deref(),
            Some("renamed")
        );
    }
}
