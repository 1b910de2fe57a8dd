// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component J: runtime configuration. YAML-backed process tunables, loaded
//! once at lifecycle `init` — distinct from the persisted discovery
//! configuration (static targets, iSNS servers, per-target overrides) which
//! lives behind [`crate::store::ConfigStore`] instead.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::model::session::ConfiguredSessions;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    /// Debounce window for `config_one`/`config_all`'s storm protection.
    #[serde(rename = "StormDelay", with = "serde_secs")]
    pub storm_delay: Duration,

    /// Initial SendTargets response-buffer capacity, before any
    /// overflow-triggered retry.
    #[serde(rename = "SendTargetsInitialCapacity")]
    pub sendtargets_initial_capacity: usize,

    /// The initiator-level fallback used when a target has no per-target
    /// `ConfiguredSessions` override.
    #[serde(rename = "DefaultConfiguredSessions")]
    pub default_configured_sessions: DefaultConfiguredSessions,

    #[serde(rename = "Logging")]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
pub struct DefaultConfiguredSessions {
    #[serde(rename = "Count")]
    pub count: u32,
    #[serde(rename = "Bound")]
    pub bound: bool,
}

impl From<DefaultConfiguredSessions> for ConfiguredSessions {
    fn from(d: DefaultConfiguredSessions) -> Self {
        ConfiguredSessions {
            count: d.count,
            bound: d.bound,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggingConfig {
    #[serde(rename = "Level")]
    pub level: String,
    #[serde(rename = "Json")]
    pub json: bool,
    #[serde(rename = "File")]
    pub file: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            storm_delay: Duration::from_secs(60),
            sendtargets_initial_capacity: 10,
            default_configured_sessions: DefaultConfiguredSessions {
                count: 1,
                bound: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
                file: None,
            },
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: RuntimeConfig =
            serde_yaml::from_str(&s).context("failed to parse runtime config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.storm_delay.is_zero(), "StormDelay must be nonzero");
        ensure!(
            self.sendtargets_initial_capacity >= 1,
            "SendTargetsInitialCapacity must be >= 1"
        );
        ensure!(
            self.default_configured_sessions.count >= 1,
            "DefaultConfiguredSessions.Count must be >= 1"
        );
        Ok(())
    }
}

mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes_validation() {
        let mut cfg = RuntimeConfig::default();
        cfg.validate_and_normalize().expect("default config is valid");
    }

    #[test]
    fn zero_storm_delay_is_rejected() {
        let mut cfg = RuntimeConfig::default();
        cfg.storm_delay = Duration::from_secs(0);
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut cfg = RuntimeConfig::default();
        cfg.sendtargets_initial_capacity = 0;
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn parses_yaml() {
        let yaml = r#"
StormDelay: 30
SendTargetsInitialCapacity: 5
DefaultConfiguredSessions:
  Count: 2
  Bound: true
Logging:
  Level: debug
  Json: true
  File: null
"#;
        let mut cfg: RuntimeConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        cfg.validate_and_normalize().expect("valid config");
        assert_eq!(cfg.storm_delay, Duration::from_secs(30));
        assert_eq!(cfg.sendtargets_initial_capacity, 5);
        assert_eq!(cfg.default_configured_sessions.count, 2);
        assert_eq!(cfg.logging.level, "debug");
    }
}
