// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use iscsi_discovery_core::{
    cfg::{RuntimeConfig, cli::resolve_config_path, logger::init_logger},
    dispatcher::Dispatcher,
    event_bus::TracingEventSink,
    harness::{StubIsnsCodec, StubSendTargetsClient, StubTransport},
    hba::Hba,
    identity::HostFacts,
    model::{address::normalize, method::MethodMask},
    store::{StaticTargetEntry, memory::MemoryStore},
};
use tracing::info;

/// Loads the runtime config from the path given as the first CLI argument,
/// or falls back to built-in defaults when none was given.
fn load_runtime_config() -> Result<RuntimeConfig> {
    let Some(rel) = std::env::args().nth(1) else {
        return Ok(RuntimeConfig::default());
    };
    let path = resolve_config_path(&rel)?;
    RuntimeConfig::load_from_file(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = load_runtime_config()?;
    let _logger_guard = init_logger(&runtime.logging)?;

    let store = Arc::new(MemoryStore::new());
    store.set_disc_meth(MethodMask::STATIC).await;
    let addr = normalize(&[192, 0, 2, 10], 3260, 1)?;
    store
        .set_static_targets(vec![StaticTargetEntry {
            name: Arc::from("iqn.2026-07.example:disk0"),
            addr,
        }])
        .await;

    let hba = Hba::new(
        store,
        Arc::new(StubTransport::new()),
        Arc::new(StubIsnsCodec::new()),
        Arc::new(StubSendTargetsClient::new()),
        Arc::new(TracingEventSink),
        runtime,
    );

    let dispatcher = Dispatcher::new(hba.clone());
    let facts = HostFacts {
        mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
        hostname: "iscsid-core-demo",
    };
    dispatcher.init(false, facts).await?;
    dispatcher.poke(None).await;

    info!(sessions = hba.registry.len().await, "discovery core initialized");

    dispatcher.fini().await?;
    info!("discovery core shut down");
    Ok(())
}
