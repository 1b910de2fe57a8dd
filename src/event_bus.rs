// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The outbound event port. The core never talks to the operating system's
//! service bus directly; it depends on the [`EventSink`] trait, and an
//! adapter that publishes to the real bus lives outside this crate.

use std::sync::Mutex;

use crate::model::method::DiscoveryMethod;

/// One of the eight subclasses the barrier publishes: a `start`/`end` pair
/// per discovery method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubclass {
    Start(DiscoveryMethod),
    End(DiscoveryMethod),
}

impl EventSubclass {
    /// The wire name used by the real sysevent bus, e.g. `STATIC_START`.
    pub fn name(self) -> &'static str {
        match self {
            EventSubclass::Start(DiscoveryMethod::Static) => "STATIC_START",
            EventSubclass::End(DiscoveryMethod::Static) => "STATIC_END",
            EventSubclass::Start(DiscoveryMethod::SendTargets) => "SEND_TARGETS_START",
            EventSubclass::End(DiscoveryMethod::SendTargets) => "SEND_TARGETS_END",
            EventSubclass::Start(DiscoveryMethod::Isns) => "ISNS_START",
            EventSubclass::End(DiscoveryMethod::Isns) => "ISNS_END",
            EventSubclass::Start(DiscoveryMethod::Slp) => "SLP_START",
            EventSubclass::End(DiscoveryMethod::Slp) => "SLP_END",
            EventSubclass::Start(DiscoveryMethod::Unknown)
            | EventSubclass::End(DiscoveryMethod::Unknown) => "UNKNOWN",
        }
    }
}

/// The outbound port for discovery events. Implementations must be cheap and
/// non-blocking; the barrier publishes on the hot path of every worker
/// cycle.
pub trait EventSink: Send + Sync {
    fn publish(&self, subclass: EventSubclass);
}

/// Publishes every event as a `tracing` event at `debug`. Suitable default
/// for the demo binary; production deployments plug in a real sysevent
/// adapter instead.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, subclass: EventSubclass) {
        tracing::debug!(event = subclass.name(), "discovery event published");
    }
}

/// Records every published event in order, for tests that assert on the
/// exact sequence the barrier emits (component M).
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<EventSubclass>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventSubclass> {
        self.events.lock().expect("event sink mutex poisoned").clone()
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, subclass: EventSubclass) {
        self.events
            .lock()
            .expect("event sink mutex poisoned")
            .push(subclass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_the_sysevent_subclasses() {
        assert_eq!(
            EventSubclass::Start(DiscoveryMethod::Static).name(),
            "STATIC_START"
        );
        assert_eq!(
            EventSubclass::End(DiscoveryMethod::SendTargets).name(),
            "SEND_TARGETS_END"
        );
        assert_eq!(
            EventSubclass::Start(DiscoveryMethod::Isns).name(),
            "ISNS_START"
        );
        assert_eq!(EventSubclass::End(DiscoveryMethod::Slp).name(), "SLP_END");
    }

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingEventSink::new();
        sink.publish(EventSubclass::Start(DiscoveryMethod::Static));
        sink.publish(EventSubclass::End(DiscoveryMethod::Static));
        assert_eq!(
            sink.events(),
            vec![
                EventSubclass::Start(DiscoveryMethod::Static),
                EventSubclass::End(DiscoveryMethod::Static),
            ]
        );
    }
}
