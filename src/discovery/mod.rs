// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component E: the four method workers. Each is a long-lived Tokio task
//! executing `while wait(wake_or_stop) { body }`; wake uses a
//! [`tokio::sync::Notify`] and stop uses a shared
//! [`tokio_util::sync::CancellationToken`], mirroring the cancellation
//! token the originating crate uses for connection teardown.
//!
//! A worker's own `enabled` flag (not its task lifetime) is what `enable`
//! and `disable` toggle — the task itself is spawned once at lifecycle
//! `init` and lives until `fini`. A disabled worker still publishes its
//! `start`/`end` pair on every wake; it just skips the method-specific
//! body. This is the only way to honor "even disabled methods emit their
//! event pair" (§4.D) without re-spawning a task on every `enable`.

pub mod isns_method;
pub mod sendtargets_method;
pub mod slp_method;
pub mod static_method;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    hba::Hba,
    isns::IsnsScnHandler,
    isns_reaction::IsnsReactionHandler,
    model::method::DiscoveryMethod,
};

struct WorkerEntry {
    notify: Arc<Notify>,
    enabled: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

/// Owns the four method workers. Spawned once by the dispatcher's `init`;
/// torn down by `fini`.
pub struct WorkerTable {
    workers: [WorkerEntry; 4],
    cancel: CancellationToken,
}

impl WorkerTable {
    /// Spawns all four workers in `DiscoveryMethod::ALL` order, each
    /// starting disabled and idle.
    pub fn spawn(hba: Arc<Hba>) -> Self {
        let cancel = CancellationToken::new();

        let static_notify = Arc::new(Notify::new());
        let static_enabled = Arc::new(AtomicBool::new(false));
        let join = spawn_loop(
            DiscoveryMethod::Static,
            hba.clone(),
            static_notify.clone(),
            static_enabled.clone(),
            cancel.clone(),
            |hba| Box::pin(static_method::run_cycle(hba)),
        );
        let static_entry = WorkerEntry {
            notify: static_notify,
            enabled: static_enabled,
            join,
        };

        let st_notify = Arc::new(Notify::new());
        let st_enabled = Arc::new(AtomicBool::new(false));
        let join = spawn_loop(
            DiscoveryMethod::SendTargets,
            hba.clone(),
            st_notify.clone(),
            st_enabled.clone(),
            cancel.clone(),
            |hba| Box::pin(sendtargets_method::run_cycle(hba)),
        );
        let sendtargets_entry = WorkerEntry {
            notify: st_notify,
            enabled: st_enabled,
            join,
        };

        let isns_notify = Arc::new(Notify::new());
        let isns_enabled = Arc::new(AtomicBool::new(false));
        let callback: Arc<dyn IsnsScnHandler> = IsnsReactionHandler::new(hba.clone());
        let join = spawn_loop(
            DiscoveryMethod::Isns,
            hba.clone(),
            isns_notify.clone(),
            isns_enabled.clone(),
            cancel.clone(),
            move |hba| {
                let callback = callback.clone();
                Box::pin(async move { isns_method::run_cycle(hba, &callback).await })
            },
        );
        let isns_entry = WorkerEntry {
            notify: isns_notify,
            enabled: isns_enabled,
            join,
        };

        let slp_notify = Arc::new(Notify::new());
        let slp_enabled = Arc::new(AtomicBool::new(false));
        let join = spawn_loop(
            DiscoveryMethod::Slp,
            hba.clone(),
            slp_notify.clone(),
            slp_enabled.clone(),
            cancel.clone(),
            |hba| Box::pin(slp_method::run_cycle(hba)),
        );
        let slp_entry = WorkerEntry {
            notify: slp_notify,
            enabled: slp_enabled,
            join,
        };

        WorkerTable {
            workers: [static_entry, sendtargets_entry, isns_entry, slp_entry],
            cancel,
        }
    }

    fn entry(&self, method: DiscoveryMethod) -> &WorkerEntry {
        let idx = DiscoveryMethod::ALL
            .iter()
            .position(|m| *m == method)
            .expect("only real methods are ever looked up");
        &self.workers[idx]
    }

    pub fn set_enabled(&self, method: DiscoveryMethod, enabled: bool) {
        self.entry(method).enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self, method: DiscoveryMethod) -> bool {
        self.entry(method).enabled.load(Ordering::SeqCst)
    }

    pub fn wake(&self, method: DiscoveryMethod) {
        self.entry(method).notify.notify_one();
    }

    pub fn wake_all(&self) {
        for m in DiscoveryMethod::ALL {
            self.wake(m);
        }
    }

    /// Cancels every worker's wake/stop signal and joins its task.
    /// Idempotent: calling it again after the table is already stopped is
    /// a no-op, since the cancellation token itself tolerates repeat
    /// cancellation and a `JoinHandle` already awaited would only be
    /// consumed once — `fini` guards against that at the dispatcher level.
    pub async fn stop_all(self) {
        self.cancel.cancel();
        self.wake_all();
        for worker in self.workers {
            let _ = worker.join.await;
        }
    }
}

type CycleFn = Box<
    dyn Fn(&Arc<Hba>) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<()>> + Send>>
        + Send,
>;

fn spawn_loop(
    method: DiscoveryMethod,
    hba: Arc<Hba>,
    notify: Arc<Notify>,
    enabled: Arc<AtomicBool>,
    cancel: CancellationToken,
    cycle: impl Fn(&Arc<Hba>) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<()>> + Send>>
    + Send
    + 'static,
) -> JoinHandle<()> {
    let cycle: CycleFn = Box::new(cycle);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = notify.notified() => {},
            }

            hba.barrier.start(method, hba.event_sink.as_ref()).await;

            if !enabled.load(Ordering::SeqCst) {
                tracing::debug!(method = %method, "method disabled, skipping cycle");
            } else if let Err(e) = cycle(&hba).await {
                tracing::warn!(method = %method, error = %e, "discovery cycle failed");
            }

            hba.barrier.end(method, hba.event_sink.as_ref()).await;
        }
    })
}
