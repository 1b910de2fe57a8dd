// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component F (discovery dispatcher) and component I (lifecycle): the
//! entry point for `init`, `fini`, `enable`, `disable`, `poke`, `props_get`,
//! `config_one`, `config_all`, `do_sendtgts` and `do_isns_query`. Bundled
//! into one type since `init` is the load-bearing half of both components
//! (§4.F, §4.I) and they share the same worker table and HBA handle.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::{
    discovery::{WorkerTable, isns_method, sendtargets_method},
    error::{DiscoveryError, Result},
    hba::Hba,
    identity::{self, HostFacts},
    model::{
        address::DiscoveryAddress,
        method::{DiscoveryMethod, MethodMask},
        params::project,
        session::TargetName,
    },
};

/// Snapshot of the discovery core's current properties, returned by
/// `props_get` — the read-only counterpart of `init`'s configuration load.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryProps {
    pub enabled: MethodMask,
    pub storm_delay: Duration,
    pub sendtargets_initial_capacity: usize,
}

/// The discovery dispatcher. Owns the worker table across its lifetime:
/// `None` before the first `init`, `Some` from then until `fini`.
pub struct Dispatcher {
    hba: Arc<Hba>,
    workers: Mutex<Option<WorkerTable>>,
}

impl Dispatcher {
    pub fn new(hba: Arc<Hba>) -> Self {
        Dispatcher {
            hba,
            workers: Mutex::new(None),
        }
    }

    pub fn hba(&self) -> &Arc<Hba> {
        &self.hba
    }

    /// Read-only snapshot of the persisted method mask plus the runtime
    /// knobs that govern worker behavior.
    pub async fn props_get(&self) -> Result<DiscoveryProps> {
        let enabled = self.hba.store.disc_meth_get().await?;
        Ok(DiscoveryProps {
            enabled,
            storm_delay: self.hba.runtime.storm_delay,
            sendtargets_initial_capacity: self.hba.runtime.sendtargets_initial_capacity,
        })
    }

    /// Administrative one-off SendTargets probe of a single address, on
    /// demand rather than waiting for the periodic worker cycle. Unlike the
    /// cycle, propagates the probe's error to the caller instead of logging
    /// and continuing — there is no "next address" to fall through to here.
    pub async fn do_sendtgts(&self, addr: DiscoveryAddress) -> Result<()> {
        sendtargets_method::probe_one(&self.hba, addr).await
    }

    /// Administrative one-off bulk iSNS query across every configured
    /// server, on demand rather than waiting for the periodic worker cycle.
    pub async fn do_isns_query(&self) -> Result<()> {
        isns_method::query_all(&self.hba).await
    }

    /// Loads persisted configuration, seeds initiator identity, installs
    /// overridden login parameters, and — on first call only — spawns the
    /// four method workers before enabling the persisted method set.
    ///
    /// On failure at any step, every method's `start`/`end` pair is still
    /// synthesized before the error is returned, so a readiness barrier
    /// blocked on `poke` is never left hanging.
    pub async fn init(&self, restart: bool, host_facts: HostFacts<'_>) -> Result<()> {
        match self.try_init(restart, host_facts).await {
            Ok(()) => Ok(()),
            Err(e) => {
                for method in DiscoveryMethod::ALL {
                    self.hba.barrier.start(method, self.hba.event_sink.as_ref()).await;
                    self.hba.barrier.end(method, self.hba.event_sink.as_ref()).await;
                }
                Err(e)
            },
        }
    }

    async fn try_init(&self, restart: bool, host_facts: HostFacts<'_>) -> Result<()> {
        self.hba.store.init(restart).await?;

        identity::bootstrap(self.hba.store.as_ref(), host_facts).await?;
        self.init_config().await?;
        self.init_targets().await?;

        let mut workers = self.workers.lock().await;
        if workers.is_none() {
            *workers = Some(WorkerTable::spawn(self.hba.clone()));
        }
        drop(workers);

        let enabled = self.hba.store.disc_meth_get().await?;
        self.enable(enabled, false).await?;
        self.disable(MethodMask::all_methods().difference(enabled)).await?;
        Ok(())
    }

    /// Installs every overridden per-initiator login parameter.
    async fn init_config(&self) -> Result<()> {
        let record = self.hba.store.initiator_params().await?;
        for id in record.overridden {
            let req = project(id, &record.values)?;
            self.hba.transport.set_params(req).await?;
        }
        Ok(())
    }

    /// Installs every overridden per-target login parameter, without
    /// logging any target in.
    async fn init_targets(&self) -> Result<()> {
        for (_name, record) in self.hba.store.target_params().await? {
            for id in record.overridden {
                let req = project(id, &record.values)?;
                self.hba.transport.set_params(req).await?;
            }
        }
        Ok(())
    }

    /// For each method in `mask`, marks its worker enabled; if `poke` is
    /// set, also wakes it. Never spawns a worker — `init` must have run
    /// first.
    pub async fn enable(&self, mask: MethodMask, poke: bool) -> Result<()> {
        let workers = self.workers.lock().await;
        let table = workers.as_ref().ok_or(DiscoveryError::WorkerMissing(DiscoveryMethod::Unknown))?;
        for method in mask.iter_methods() {
            table.set_enabled(method, true);
            if poke {
                table.wake(method);
            }
        }
        Ok(())
    }

    /// For each method in `mask`: publishes `start`, attempts
    /// `registry.del(None, method, None)`, disables the worker only if
    /// that succeeded, then publishes `end` exactly once regardless of
    /// outcome. A `del` failure aborts the remaining methods.
    pub async fn disable(&self, mask: MethodMask) -> Result<()> {
        let workers = self.workers.lock().await;
        let table = workers.as_ref().ok_or(DiscoveryError::WorkerMissing(DiscoveryMethod::Unknown))?;

        for method in mask.iter_methods() {
            self.hba.barrier.start(method, self.hba.event_sink.as_ref()).await;
            let del_result = self.hba.registry.del(None, method, None).await;
            if del_result.is_ok() {
                table.set_enabled(method, false);
            }
            self.hba.barrier.end(method, self.hba.event_sink.as_ref()).await;
            del_result?;
        }
        Ok(())
    }

    /// Clears `emitted_ends`, wakes the targeted worker (or all, when
    /// `method` is `None`), and blocks until the corresponding `end`
    /// event(s) have been observed.
    pub async fn poke(&self, method: Option<DiscoveryMethod>) {
        let workers = self.workers.lock().await;
        let Some(table) = workers.as_ref() else {
            return;
        };

        self.hba.barrier.reset_ends().await;
        match method {
            Some(m) => table.wake(m),
            None => table.wake_all(),
        }
        let mask = method
            .and_then(DiscoveryMethod::bit)
            .unwrap_or_else(MethodMask::all_methods);
        drop(workers);
        self.hba.barrier.wait_complete(mask).await;
    }

    async fn debounce_expired(&self) -> bool {
        let last = *self.hba.last_config.lock().await;
        match last {
            Some(t) => t.elapsed() > self.hba.runtime.storm_delay,
            None => true,
        }
    }

    async fn touch_last_config(&self) {
        *self.hba.last_config.lock().await = Some(Instant::now());
    }

    /// Attempts to log `name` in. If no session currently matches and
    /// either `protect` is false or the storm-debounce window has
    /// expired, runs one discovery `poke` cycle and retries once.
    pub async fn config_one(&self, name: &TargetName, protect: bool) -> Result<bool> {
        let _permit = self
            .hba
            .config_semaphore
            .acquire()
            .await
            .expect("config semaphore is never closed");

        let mut matched = self
            .hba
            .registry
            .login_targets(Some(name), DiscoveryMethod::Unknown, None)
            .await;

        if !matched && (!protect || self.debounce_expired().await) {
            self.poke(None).await;
            matched = self
                .hba
                .registry
                .login_targets(Some(name), DiscoveryMethod::Unknown, None)
                .await;
        }

        self.touch_last_config().await;
        Ok(matched)
    }

    /// Same debounce semantics as `config_one`, then unconditionally
    /// attempts to log every session in.
    pub async fn config_all(&self, protect: bool) -> Result<bool> {
        let _permit = self
            .hba
            .config_semaphore
            .acquire()
            .await
            .expect("config semaphore is never closed");

        if !protect || self.debounce_expired().await {
            self.poke(None).await;
        }
        self.touch_last_config().await;

        Ok(self
            .hba
            .registry
            .login_targets(None, DiscoveryMethod::Unknown, None)
            .await)
    }

    /// Stops every worker and deregisters from iSNS if it had registered.
    /// A no-op if `init` was never called or `fini` already ran.
    pub async fn fini(&self) -> Result<()> {
        let mut workers = self.workers.lock().await;
        let Some(table) = workers.take() else {
            return Ok(());
        };
        drop(workers);

        isns_method::deregister_if_needed(&self.hba).await?;
        table.stop_all().await;
        Ok(())
    }
}
