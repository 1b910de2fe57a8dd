// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Integration tests exercising the discovery core end to end through
//! [`Dispatcher`] and [`Hba`], wired up entirely with the in-memory
//! collaborators in `harness` (component M). No real store, transport,
//! iSNS server or SendTargets RPC is ever involved.

use std::{collections::HashSet, sync::Arc};

use iscsi_discovery_core::{
    cfg::RuntimeConfig,
    dispatcher::Dispatcher,
    event_bus::{EventSubclass, RecordingEventSink},
    harness::{StubIsnsCodec, StubSendTargetsClient, StubTransport},
    hba::Hba,
    identity::HostFacts,
    isns::{IsnsScnHandler, ScnEvent, ScnType},
    isns_reaction::IsnsReactionHandler,
    model::{
        address::normalize,
        method::{DiscoveryMethod, MethodMask},
        session::ConfiguredSessions,
    },
    sendtargets::{SendTargetsOutcome, TargetEntry},
    store::{PersistentParamRecord, memory::MemoryStore},
};
use serial_test::serial;

fn facts() -> HostFacts<'static> {
    HostFacts {
        mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
        hostname: "test-initiator",
    }
}

/// Wires a fresh [`Hba`] against `store`, returning it alongside handles to
/// the three stub collaborators a test needs to seed responses on.
fn build_hba(
    store: Arc<MemoryStore>,
    runtime: RuntimeConfig,
) -> (
    Arc<Hba>,
    Arc<RecordingEventSink>,
    Arc<StubSendTargetsClient>,
    Arc<StubIsnsCodec>,
) {
    let sink = Arc::new(RecordingEventSink::new());
    let sendtargets = Arc::new(StubSendTargetsClient::new());
    let isns_codec = Arc::new(StubIsnsCodec::new());

    let hba = Hba::new(
        store,
        Arc::new(StubTransport::new()),
        isns_codec.clone(),
        sendtargets.clone(),
        sink.clone(),
        runtime,
    );
    (hba, sink, sendtargets, isns_codec)
}

/// Scenario 1: barrier completeness. Against an empty store, `init` must
/// synthesize exactly the eight start/end events — one pair per method —
/// before it returns, regardless of what's persisted.
#[tokio::test]
async fn init_against_empty_store_emits_every_start_end_pair() {
    let store = Arc::new(MemoryStore::new());
    let (hba, sink, _sendtargets, _isns) = build_hba(store, RuntimeConfig::default());
    let dispatcher = Dispatcher::new(hba);

    dispatcher.init(false, facts()).await.expect("init against an empty store succeeds");

    let names: HashSet<&'static str> = sink.events().into_iter().map(EventSubclass::name).collect();
    let expected: HashSet<&'static str> = [
        "STATIC_START",
        "STATIC_END",
        "SEND_TARGETS_START",
        "SEND_TARGETS_END",
        "ISNS_START",
        "ISNS_END",
        "SLP_START",
        "SLP_END",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);
}

fn target_entry(n: usize, addr: iscsi_discovery_core::model::address::DiscoveryAddress) -> TargetEntry {
    TargetEntry {
        target_name: Arc::from(format!("iqn.test:disk{n}")),
        target_addr: addr,
        tpgt: 1,
    }
}

/// Scenario 2: a SendTargets server reports more entries than fit in the
/// initial capacity; the worker retries once with the reported count and
/// ingests every entry from the successful retry.
#[tokio::test]
async fn sendtargets_overflow_is_recovered_by_one_retry() {
    let store = Arc::new(MemoryStore::new());
    let addr = normalize(&[192, 0, 2, 1], 3260, 1).expect("valid address");
    store.set_disc_meth(MethodMask::SEND_TARGETS).await;
    store.set_discovery_addrs(vec![addr]).await;

    let mut runtime = RuntimeConfig::default();
    runtime.sendtargets_initial_capacity = 10;
    let (hba, _sink, sendtargets, _isns) = build_hba(store, runtime);

    let entries: Vec<TargetEntry> = (0..15).map(|n| target_entry(n, addr)).collect();
    sendtargets
        .queue(
            addr,
            vec![
                SendTargetsOutcome::Overflow { returned: 15 },
                SendTargetsOutcome::Entries(entries),
            ],
        )
        .await;

    let dispatcher = Dispatcher::new(hba.clone());
    dispatcher.init(false, facts()).await.expect("init succeeds");
    dispatcher.poke(Some(DiscoveryMethod::SendTargets)).await;

    let sessions = hba.registry.sessions_by_method(DiscoveryMethod::SendTargets).await;
    assert_eq!(sessions.len(), 15, "every entry from the successful retry must be ingested");
}

/// Scenario 3: the retry itself still overflows. The address is skipped
/// entirely rather than ingesting a truncated list, and no sessions result.
#[tokio::test]
async fn sendtargets_overflow_on_retry_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let addr = normalize(&[192, 0, 2, 2], 3260, 1).expect("valid address");
    store.set_disc_meth(MethodMask::SEND_TARGETS).await;
    store.set_discovery_addrs(vec![addr]).await;

    let (hba, _sink, sendtargets, _isns) = build_hba(store, RuntimeConfig::default());
    sendtargets
        .queue(
            addr,
            vec![
                SendTargetsOutcome::Overflow { returned: 20 },
                SendTargetsOutcome::Overflow { returned: 20 },
            ],
        )
        .await;

    let dispatcher = Dispatcher::new(hba.clone());
    dispatcher.init(false, facts()).await.expect("init succeeds");
    dispatcher.poke(Some(DiscoveryMethod::SendTargets)).await;

    assert!(
        hba.registry.sessions_by_method(DiscoveryMethod::SendTargets).await.is_empty(),
        "an address that overflows twice contributes no sessions"
    );
}

/// Scenario 4: `config_one`'s storm debounce. Two calls in quick succession
/// for a target with no matching session must still trigger only one
/// discovery cycle, since the second call falls inside the debounce window.
#[tokio::test]
#[serial]
async fn config_one_debounces_a_second_call_inside_the_storm_window() {
    let store = Arc::new(MemoryStore::new());
    let (hba, sink, _sendtargets, _isns) = build_hba(store, RuntimeConfig::default());
    let dispatcher = Dispatcher::new(hba);
    dispatcher.init(false, facts()).await.expect("init succeeds");

    let static_starts = |sink: &RecordingEventSink| {
        sink.events()
            .into_iter()
            .filter(|e| *e == EventSubclass::Start(DiscoveryMethod::Static))
            .count()
    };
    let before = static_starts(&sink);

    let name: iscsi_discovery_core::model::session::TargetName = Arc::from("iqn.storm:target0");
    dispatcher.config_one(&name, true).await.expect("first config_one succeeds");
    dispatcher.config_one(&name, true).await.expect("second config_one succeeds");

    let after = static_starts(&sink);
    assert_eq!(
        after - before,
        1,
        "the second call must be absorbed by the storm debounce, not trigger its own cycle"
    );
}

/// Scenario 5: an iSNS `ObjRemoved` notification destroys every session
/// discovered for that target and cleans up its orphaned parameter override.
#[tokio::test]
async fn isns_obj_removed_destroys_sessions_and_orphaned_param_record() {
    let store = Arc::new(MemoryStore::new());
    let name: iscsi_discovery_core::model::session::TargetName = Arc::from("iqn.isns:removed-target");
    store
        .set_config_session(name.clone(), ConfiguredSessions { count: 2, bound: true })
        .await;
    store.set_target_param(name.clone(), PersistentParamRecord::default()).await;

    let (hba, _sink, _sendtargets, _isns) = build_hba(store, RuntimeConfig::default());
    let addr = normalize(&[198, 51, 100, 1], 3260, 1).expect("valid address");
    hba.registry
        .add(DiscoveryMethod::Isns, addr, name.clone(), 1, addr)
        .await
        .expect("seeding the two iSNS sessions succeeds");
    assert_eq!(hba.registry.sessions_by_method(DiscoveryMethod::Isns).await.len(), 2);

    let handler = IsnsReactionHandler::new(hba.clone());
    handler
        .handle_scn(ScnEvent {
            scn_type: ScnType::ObjRemoved,
            source_key: name.clone(),
        })
        .await;

    assert!(
        hba.registry.sessions_by_method(DiscoveryMethod::Isns).await.is_empty(),
        "ObjRemoved must destroy every session for that target"
    );
    assert!(
        hba.store.target_param_get(&name).await.expect("store available").is_none(),
        "the orphaned per-target parameter override must be removed once no session references it"
    );
}

/// Scenario 6: the Static match algebra keys on the active connection's
/// address, not the discovery address used to configure the target.
#[tokio::test]
async fn static_removal_matches_on_active_connection_address_only() {
    let store = Arc::new(MemoryStore::new());
    let (hba, _sink, _sendtargets, _isns) = build_hba(store, RuntimeConfig::default());

    let name: iscsi_discovery_core::model::session::TargetName = Arc::from("iqn.static:disk0");
    let active = normalize(&[10, 0, 0, 1], 3260, 1).expect("valid address");
    let other = normalize(&[10, 0, 0, 2], 3260, 1).expect("valid address");

    hba.registry
        .add(DiscoveryMethod::Static, active, name.clone(), 1, active)
        .await
        .expect("seeding the static session succeeds");

    hba.registry
        .del(None, DiscoveryMethod::Static, Some(other))
        .await
        .expect("a non-matching address is not an error, just no match");
    assert_eq!(hba.registry.sessions_by_method(DiscoveryMethod::Static).await.len(), 1);

    hba.registry
        .del(None, DiscoveryMethod::Static, Some(active))
        .await
        .expect("the matching address removes the session");
    assert!(hba.registry.sessions_by_method(DiscoveryMethod::Static).await.is_empty());
}
