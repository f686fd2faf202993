//! Virtual clock with one-shot timers.
//!
//! The host advances time through `Engine::update(dt, ..)`; timers fire in
//! (due time, scheduling order), so equal deadlines keep insertion order.

use serde::{Deserialize, Serialize};

use crate::ids::{IdAllocator, NodeId, TimerId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Debounced content rescan.
    Rescan,
    /// Poll for the character animator capability.
    AnimatorRetry,
    /// Start a suppressed section even without the readiness signal.
    SuppressionTimeout(NodeId),
    /// Announce readiness once the last block settled.
    ReadyGrace(NodeId),
}

#[derive(Clone, Debug)]
struct Timer {
    id: TimerId,
    due: u64,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    now: u64,
    ids: IdAllocator,
    pending: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, delay: u64, kind: TimerKind) -> TimerId {
        let id = self.ids.alloc_timer();
        self.pending.push(Timer {
            id,
            due: self.now.saturating_add(delay),
            kind,
        });
        id
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.id != id);
        self.pending.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to it.
    pub fn pop_due(&mut self, until: u64) -> Option<TimerKind> {
        let pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(pos, _)| pos)?;
        let timer = self.pending.remove(pos);
        self.now = self.now.max(timer.due);
        Some(timer.kind)
    }

    pub fn advance_to(&mut self, t: u64) {
        self.now = self.now.max(t);
    }
}
