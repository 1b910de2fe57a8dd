// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component D: the discovery-event barrier. Tracks which methods have
//! published their terminal `end` event in the current cycle and supports
//! the blocking `poke` semantics an external readiness daemon relies on.

use std::time::Duration;

use tokio::sync::Mutex;

use crate::{
    event_bus::{EventSink, EventSubclass},
    model::method::{DiscoveryMethod, MethodMask},
};

/// How long `wait_complete` sleeps between polls of `emitted_ends`. Exposed
/// as a constant rather than a runtime knob because it purely bounds poke
/// latency, not behavior.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct BarrierState {
    emitted_ends: MethodMask,
    in_progress: bool,
}

/// Tracks one discovery cycle's `start`/`end` bookkeeping across all four
/// methods. A single barrier is shared by every worker and by the
/// dispatcher's `poke`.
#[derive(Debug, Default)]
pub struct EventBarrier {
    state: Mutex<BarrierState>,
}

impl EventBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `<method>_START` and marks a cycle in progress. Does not
    /// touch `emitted_ends` — a `start` never counts as completion.
    pub async fn start(&self, method: DiscoveryMethod, sink: &dyn EventSink) {
        {
            let mut st = self.state.lock().await;
            st.in_progress = true;
        }
        sink.publish(EventSubclass::Start(method));
    }

    /// Publishes `<method>_END` and sets the method's bit in `emitted_ends`.
    /// Always safe to call more than once per cycle; only the bit's presence
    /// matters to `wait_complete`.
    pub async fn end(&self, method: DiscoveryMethod, sink: &dyn EventSink) {
        if let Some(bit) = method.bit() {
            let mut st = self.state.lock().await;
            st.emitted_ends.insert(bit);
        }
        sink.publish(EventSubclass::End(method));
    }

    /// Clears `emitted_ends` atomically. Called by `poke` before waking the
    /// targeted worker(s), so a stale `end` from the previous cycle can
    /// never be mistaken for this cycle's completion.
    pub async fn reset_ends(&self) {
        let mut st = self.state.lock().await;
        st.emitted_ends = MethodMask::empty();
        st.in_progress = true;
    }

    /// Blocks, polling every [`POLL_INTERVAL`], until every bit in `mask` has
    /// been set in `emitted_ends`, then clears `in_progress`.
    pub async fn wait_complete(&self, mask: MethodMask) {
        loop {
            {
                let st = self.state.lock().await;
                if st.emitted_ends.contains(mask) {
                    break;
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        let mut st = self.state.lock().await;
        st.in_progress = false;
    }

    pub async fn in_progress(&self) -> bool {
        self.state.lock().await.in_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::RecordingEventSink;

    #[tokio::test]
    async fn end_sets_only_its_own_bit() {
        let barrier = EventBarrier::new();
        let sink = RecordingEventSink::new();
        barrier.end(DiscoveryMethod::Static, &sink).await;

        barrier
            .wait_complete(MethodMask::STATIC)
            .await; // must not block: bit already set
        assert!(!barrier.in_progress().await);
    }

    #[tokio::test]
    async fn reset_then_wait_blocks_until_end() {
        let barrier = std::sync::Arc::new(EventBarrier::new());
        let sink = std::sync::Arc::new(RecordingEventSink::new());

        barrier.reset_ends().await;
        assert!(barrier.in_progress().await);

        let b2 = barrier.clone();
        let s2 = sink.clone();
        let waiter = tokio::spawn(async move {
            b2.wait_complete(MethodMask::all_methods()).await;
        });

        // Give the waiter a chance to start polling before we complete it.
        tokio::time::sleep(Duration::from_millis(10)).await;
        for m in DiscoveryMethod::ALL {
            barrier.end(m, s2.as_ref()).await;
        }

        tokio::time::timeout(Duration::from_secs(3), waiter)
            .await
            .expect("wait_complete should return once all ends are in")
            .expect("waiter task should not panic");
        assert!(!barrier.in_progress().await);
    }
}
