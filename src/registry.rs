// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component C: the session registry. The canonical table of sessions,
//! keyed by [`SessionKey`], under a single-writer/many-reader discipline.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    error::{DiscoveryError, Result},
    model::{
        address::DiscoveryAddress,
        method::DiscoveryMethod,
        session::{ConfiguredSessions, Session, SessionKey, SessionState, TargetName},
    },
    store::ConfigStore,
    transport::TransportEngine,
};

/// The canonical, in-process session table plus the two collaborators it
/// must consult to populate and drain it.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionKey, Session>>,
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn TransportEngine>,
    /// The initiator-level fallback used when a target has no per-target
    /// `ConfiguredSessions` override (component J's `RuntimeConfig`).
    default_configured_sessions: ConfiguredSessions,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        transport: Arc<dyn TransportEngine>,
        default_configured_sessions: ConfiguredSessions,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            transport,
            default_configured_sessions,
        }
    }

    /// Number of sessions currently in the table. For tests and diagnostics
    /// only.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Returns a clone of every session whose `discovered_by` equals
    /// `method`, for tests that want to assert on what got added.
    pub async fn sessions_by_method(&self, method: DiscoveryMethod) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.discovered_by() == method)
            .cloned()
            .collect()
    }

    /// Adds (or, idempotently, does nothing for) the `ConfiguredSessions`-many
    /// sessions for `target_name` discovered via `method` at
    /// `discovered_addr`, each connected to `target_addr`.
    ///
    /// Partial failure (mid-batch, at some `isid > 0`) leaves the sessions
    /// already created for smaller `isid`s in place — this is intentional,
    /// documented behavior (see `SPEC_FULL.md` §9), not a bug to fix here.
    pub async fn add(
        &self,
        method: DiscoveryMethod,
        discovered_addr: DiscoveryAddress,
        target_name: TargetName,
        tpgt: u16,
        target_addr: DiscoveryAddress,
    ) -> Result<()> {
        let per_target = self.store.get_config_session(&target_name).await?;
        let configured =
            ConfiguredSessions::resolve(per_target, Some(self.default_configured_sessions));

        let mut sessions = self.sessions.write().await;
        for isid in 0..configured.count {
            let key = SessionKey {
                target_name: target_name.clone(),
                discovery_method: method,
                discovered_addr,
                isid,
            };
            if sessions.contains_key(&key) {
                // `add` following `add` with identical arguments is a no-op.
                continue;
            }

            let handle = self
                .transport
                .sess_create(
                    method,
                    discovered_addr,
                    target_name.clone(),
                    tpgt,
                    isid,
                    SessionState::Normal,
                )
                .await?;
            self.transport.conn_create(target_addr, handle).await?;

            sessions.insert(
                key.clone(),
                Session {
                    key,
                    tpgt,
                    target_addr,
                    state: SessionState::Normal,
                    transport_handle: handle,
                },
            );
        }

        Ok(())
    }

    /// Destroys every session matching `(target_name, method, discovered_addr)`
    /// under the method-sensitive address algebra in §4.C. Sessions the
    /// transport engine refuses to destroy are left in place and the overall
    /// result reports failure, but every other match is still attempted.
    pub async fn del(
        &self,
        target_name: Option<&TargetName>,
        method: DiscoveryMethod,
        discovered_addr: Option<DiscoveryAddress>,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;

        let candidates: Vec<SessionKey> = sessions
            .iter()
            .filter(|(_, s)| is_candidate(s, target_name, method, discovered_addr))
            .map(|(k, _)| k.clone())
            .collect();

        let mut all_destroyed = true;
        for key in candidates {
            let Some(session) = sessions.get(&key) else {
                continue;
            };
            match self.transport.sess_destroy(session.transport_handle).await {
                Ok(()) => {
                    sessions.remove(&key);
                    let target = key.target_name.clone();
                    let still_present =
                        sessions.values().any(|s| s.key.target_name == target);
                    if !still_present {
                        self.store.remove_target_param(&target).await?;
                    }
                },
                Err(DiscoveryError::SessionBusy) => {
                    all_destroyed = false;
                    tracing::warn!(target_name = %key.target_name, "session busy, destroy refused");
                },
                Err(e) => return Err(e),
            }
        }

        if all_destroyed {
            Ok(())
        } else {
            Err(DiscoveryError::SessionBusy)
        }
    }

    /// Requests `online` from the transport engine for every session
    /// matching `(target_name, method, discovered_addr)`. `method = Unknown`
    /// matches every session (used by `config_all`). Returns whether at
    /// least one session was matched, regardless of whether the online
    /// request itself succeeded.
    pub async fn login_targets(
        &self,
        target_name: Option<&TargetName>,
        method: DiscoveryMethod,
        discovered_addr: Option<DiscoveryAddress>,
    ) -> bool {
        let handles: Vec<_> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| is_candidate(s, target_name, method, discovered_addr))
                .map(|(_, s)| (s.key.target_name.clone(), s.transport_handle))
                .collect()
        };

        let matched = !handles.is_empty();
        for (target_name, handle) in handles {
            if let Err(e) = self.transport.sess_online(handle).await {
                tracing::warn!(target_name = %target_name, error = %e, "online request failed");
            }
        }
        matched
    }
}

/// The method-sensitive candidate predicate shared by `del` and
/// `login_targets` (§4.C).
fn is_candidate(
    session: &Session,
    target_name: Option<&TargetName>,
    method: DiscoveryMethod,
    discovered_addr: Option<DiscoveryAddress>,
) -> bool {
    if let Some(t) = target_name {
        if t != &session.key.target_name {
            return false;
        }
    }
    if !method.matches(session.discovered_by()) {
        return false;
    }
    match method {
        DiscoveryMethod::Isns | DiscoveryMethod::SendTargets => discovered_addr
            .map(|a| a == session.key.discovered_addr)
            .unwrap_or(true),
        DiscoveryMethod::Static => discovered_addr
            .map(|a| a.same_base(&session.target_addr))
            .unwrap_or(true),
        DiscoveryMethod::Slp | DiscoveryMethod::Unknown => true,
    }
}
