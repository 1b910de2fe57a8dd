// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The discovery core's error taxonomy.
//!
//! Every fallible core entry point returns [`DiscoveryError`] (or wraps one in
//! `anyhow::Error` once free-form context is attached at the call site),
//! rather than each failure mode living in its own struct.

use thiserror::Error;

use crate::model::method::DiscoveryMethod;

/// A single enum covering every error kind the core can report.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// An address normalizer input had a length other than 4 or 16 bytes.
    #[error("bad address: expected 4 or 16 raw bytes, got {0}")]
    BadAddress(usize),

    /// A lookup against the persistent configuration store failed.
    #[error("persistent store unavailable: {0}")]
    StoreUnavailable(String),

    /// A SendTargets or iSNS transport call failed.
    #[error("RPC failure: {0}")]
    RpcFailure(String),

    /// A SendTargets result still exceeded capacity after one retry.
    #[error("SendTargets result overflowed capacity {capacity} (retried)")]
    Overflow { capacity: usize },

    /// The transport engine refused to destroy a session.
    #[error("session busy, destroy refused")]
    SessionBusy,

    /// The requested login parameter is outside the settable catalogue.
    #[error("unsupported parameter: {0}")]
    Unsupported(String),

    /// Internal invariant: a method was referenced that has no worker.
    #[error("no worker registered for method {0:?}")]
    WorkerMissing(DiscoveryMethod),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
