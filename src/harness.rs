// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component M: the test harness. In-memory reference implementations of
//! every external collaborator trait this core consumes, used by both the
//! demo binary and the integration tests in `tests/` — not gated behind
//! `#[cfg(test)]` since the demo binary needs them too.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::{DiscoveryError, Result},
    isns::{IsnsCodec, IsnsScnHandler, ScnEvent},
    model::{
        address::DiscoveryAddress,
        method::DiscoveryMethod,
        params::SetRequest,
        session::{SessionState, TargetName},
    },
    sendtargets::{SendTargetsClient, SendTargetsOutcome, TargetEntry},
    transport::{ConnHandle, SessionHandle, TransportEngine},
};

/// A [`TransportEngine`] that hands out monotonically increasing handles
/// and never fails, unless a target name has been marked busy via
/// [`StubTransport::set_busy`] — then `sess_destroy` for any session
/// created under that target name refuses with [`DiscoveryError::SessionBusy`].
#[derive(Default)]
pub struct StubTransport {
    next: AtomicU64,
    sessions: Mutex<HashMap<SessionHandle, TargetName>>,
    busy_targets: Mutex<std::collections::HashSet<TargetName>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_busy(&self, target_name: TargetName, busy: bool) {
        let mut set = self.busy_targets.lock().await;
        if busy {
            set.insert(target_name);
        } else {
            set.remove(&target_name);
        }
    }

    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportEngine for StubTransport {
    async fn set_params(&self, _req: SetRequest) -> Result<()> {
        Ok(())
    }

    async fn sess_create(
        &self,
        _method: DiscoveryMethod,
        _discovered_addr: DiscoveryAddress,
        target_name: TargetName,
        _tpgt: u16,
        _isid: u32,
        _state: SessionState,
    ) -> Result<SessionHandle> {
        let handle = SessionHandle(self.next_id());
        self.sessions.lock().await.insert(handle, target_name);
        Ok(handle)
    }

    async fn conn_create(
        &self,
        _target_addr: DiscoveryAddress,
        _session: SessionHandle,
    ) -> Result<ConnHandle> {
        Ok(ConnHandle(self.next_id()))
    }

    async fn sess_destroy(&self, session: SessionHandle) -> Result<()> {
        let sessions = self.sessions.lock().await;
        if let Some(name) = sessions.get(&session) {
            if self.busy_targets.lock().await.contains(name) {
                return Err(DiscoveryError::SessionBusy);
            }
        }
        Ok(())
    }

    async fn sess_online(&self, _session: SessionHandle) -> Result<()> {
        Ok(())
    }
}

/// A [`SendTargetsClient`] whose response per discovery address is
/// pre-seeded, including overflow sequences.
#[derive(Default)]
pub struct StubSendTargetsClient {
    responses: Mutex<HashMap<DiscoveryAddress, Vec<SendTargetsOutcome>>>,
}

impl StubSendTargetsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcomes `get` returns for `addr`, in call order. The
    /// last queued outcome repeats once the queue is exhausted.
    pub async fn queue(&self, addr: DiscoveryAddress, outcomes: Vec<SendTargetsOutcome>) {
        self.responses.lock().await.insert(addr, outcomes);
    }
}

#[async_trait]
impl SendTargetsClient for StubSendTargetsClient {
    async fn get(&self, addr: DiscoveryAddress, _capacity: usize) -> Result<SendTargetsOutcome> {
        let mut responses = self.responses.lock().await;
        let Some(queue) = responses.get_mut(&addr) else {
            return Ok(SendTargetsOutcome::Entries(Vec::new()));
        };
        if queue.len() > 1 {
            Ok(queue.remove(0))
        } else {
            Ok(queue.first().cloned().unwrap_or(SendTargetsOutcome::Entries(Vec::new())))
        }
    }
}

/// An [`IsnsCodec`] whose query results are pre-seeded and whose `reg`
/// records the callback so a test can later drive [`StubIsnsCodec::deliver`]
/// to simulate a server-pushed SCN.
#[derive(Default)]
pub struct StubIsnsCodec {
    registered: AtomicBool,
    callback: Mutex<Option<Arc<dyn IsnsScnHandler>>>,
    bulk_entries: Mutex<Vec<TargetEntry>>,
    node_entries: Mutex<HashMap<TargetName, Vec<TargetEntry>>>,
}

impl StubIsnsCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_bulk_entries(&self, entries: Vec<TargetEntry>) {
        *self.bulk_entries.lock().await = entries;
    }

    pub async fn set_node_entries(&self, name: TargetName, entries: Vec<TargetEntry>) {
        self.node_entries.lock().await.insert(name, entries);
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Simulates the iSNS server pushing `event` to whichever callback was
    /// registered via `reg`. A no-op if nothing has registered.
    pub async fn deliver(&self, event: ScnEvent) {
        if let Some(cb) = self.callback.lock().await.clone() {
            cb.handle_scn(event).await;
        }
    }
}

#[async_trait]
impl IsnsCodec for StubIsnsCodec {
    async fn reg(&self, callback: Arc<dyn IsnsScnHandler>) -> Result<()> {
        self.registered.store(true, Ordering::SeqCst);
        *self.callback.lock().await = Some(callback);
        Ok(())
    }

    async fn dereg(&self) -> Result<()> {
        self.registered.store(false, Ordering::SeqCst);
        *self.callback.lock().await = None;
        Ok(())
    }

    async fn query(&self) -> Result<Vec<TargetEntry>> {
        Ok(self.bulk_entries.lock().await.clone())
    }

    async fn query_one_server(&self) -> Result<Vec<TargetEntry>> {
        Ok(self.bulk_entries.lock().await.clone())
    }

    async fn query_one_node(&self, source_key: &TargetName) -> Result<Vec<TargetEntry>> {
        Ok(self
            .node_entries
            .lock()
            .await
            .get(source_key)
            .cloned()
            .unwrap_or_default())
    }
}
