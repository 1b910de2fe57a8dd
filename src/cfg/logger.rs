// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component K: logging setup, trimmed down to what this core needs —
//! env-filter level control, a single formatting layer (plain or JSON),
//! and optional file rotation. The originating crate's span-field-capturing
//! layer is not reproduced here; this core does not need per-span structured
//! field capture to operate correctly. The `fastrace` compatibility layer is
//! retained so worker-cycle span timings remain exportable the same way.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fastrace::collector::{Config as FastraceConfig, ConsoleReporter};
use tracing_appender::{non_blocking::WorkerGuard, rolling::Rotation};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

use crate::cfg::config::LoggingConfig;

/// Installs the global `tracing` subscriber per `cfg`. Returns the
/// [`WorkerGuard`] the caller must keep alive for the process lifetime of
/// any non-blocking file/stdout writer.
pub fn init_logger(cfg: &LoggingConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_new(&cfg.level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("failed to parse log level from config or env")?;

    fastrace::set_reporter(ConsoleReporter, FastraceConfig::default());
    let compat_layer = fastrace_tracing::FastraceCompatLayer::new();

    let (writer, guard) = match &cfg.file {
        Some(path) => file_writer(path)?,
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(cfg.file.is_none());

    if cfg.json {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(compat_layer)
            .with(fmt_layer.json());
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set global default subscriber")?;
    } else {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(compat_layer)
            .with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set global default subscriber")?;
    }

    Ok(guard)
}

fn file_writer(
    path: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = PathBuf::from(path);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let appender = tracing_appender::rolling::RollingFileAppender::new(
        Rotation::NEVER,
        dir,
        path.file_name().unwrap_or_default(),
    );
    Ok(tracing_appender::non_blocking(appender))
}
