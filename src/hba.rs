// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The shared initiator-level handle. Bundles every external collaborator
//! and shared resource the discovery core's entry points need, in place of
//! the originating crate's process-singleton HBA (`ddi_get_soft_state`):
//! here it is an explicit, reference-counted handle threaded into every
//! entry point instead of looked up from a global.

use std::sync::{Arc, atomic::AtomicBool};

use tokio::sync::{Mutex, Semaphore};

use crate::{
    cfg::RuntimeConfig,
    event_bus::EventSink,
    isns::IsnsCodec,
    model::event::EventBarrier,
    registry::SessionRegistry,
    sendtargets::SendTargetsClient,
    store::ConfigStore,
    transport::TransportEngine,
};

/// The initiator-level container: session table, identity, and every
/// external collaborator, plus the shared resources §5 calls for (the
/// per-HBA SendTargets semaphore, the process-wide config semaphore, and
/// the debounce clock).
pub struct Hba {
    pub store: Arc<dyn ConfigStore>,
    pub transport: Arc<dyn TransportEngine>,
    pub isns_codec: Arc<dyn IsnsCodec>,
    pub sendtargets_client: Arc<dyn SendTargetsClient>,
    pub event_sink: Arc<dyn EventSink>,
    pub registry: Arc<SessionRegistry>,
    pub barrier: Arc<EventBarrier>,
    pub runtime: RuntimeConfig,

    /// Serializes SendTargets RPCs across the whole HBA (count 1).
    pub sendtargets_semaphore: Semaphore,
    /// Serializes `config_one`/`config_all` callers (count 1).
    pub config_semaphore: Semaphore,
    /// The debounce clock `config_one`/`config_all` compare against.
    pub last_config: Mutex<Option<std::time::Instant>>,
    /// Whether the iSNS worker currently holds a live registration, so
    /// `fini` knows whether to deregister.
    pub isns_registered: AtomicBool,
}

impl Hba {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        transport: Arc<dyn TransportEngine>,
        isns_codec: Arc<dyn IsnsCodec>,
        sendtargets_client: Arc<dyn SendTargetsClient>,
        event_sink: Arc<dyn EventSink>,
        runtime: RuntimeConfig,
    ) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new(
            store.clone(),
            transport.clone(),
            runtime.default_configured_sessions.into(),
        ));

        Arc::new(Hba {
            store,
            transport,
            isns_codec,
            sendtargets_client,
            event_sink,
            registry,
            barrier: Arc::new(EventBarrier::new()),
            runtime,
            sendtargets_semaphore: Semaphore::new(1),
            config_semaphore: Semaphore::new(1),
            last_config: Mutex::new(None),
            isns_registered: AtomicBool::new(false),
        })
    }
}
