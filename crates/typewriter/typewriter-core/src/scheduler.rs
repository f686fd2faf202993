//! Visibility scheduling: decides when containers may start typing.

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{Config, Context};
use crate::dom::Document;
use crate::ids::{NodeId, TimerId};
use crate::inputs::Intersection;
use crate::outputs::{Outputs, TypewriterEvent};
use crate::timers::{TimerKind, TimerQueue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchStrategy {
    /// Watch a section ancestor; start every container inside it.
    Section,
    /// Watch a container that has no section ancestor.
    Standalone,
}

/// Typing containers inside `section`, in document order.
pub fn containers_in(doc: &Document, section: NodeId, cfg: &Config) -> Vec<NodeId> {
    doc.elements_by_class(section, &cfg.container_class)
}

#[derive(Debug, Default)]
pub struct VisibilityScheduler {
    threshold: f32,
    suppression_timeout: u64,
    observed: IndexMap<NodeId, WatchStrategy>,
    /// Suppressed sections waiting for the signal, with their timeout timer.
    gates: HashMap<NodeId, TimerId>,
}

impl VisibilityScheduler {
    pub fn new(cfg: &Config) -> Self {
        Self {
            threshold: cfg.visibility_threshold,
            suppression_timeout: cfg.suppression_timeout,
            observed: IndexMap::new(),
            gates: HashMap::new(),
        }
    }

    pub fn observe(&mut self, target: NodeId, strategy: WatchStrategy, outputs: &mut Outputs) -> bool {
        if self.observed.contains_key(&target) {
            return false;
        }
        self.observed.insert(target, strategy);
        outputs.push_event(TypewriterEvent::Observe {
            target,
            strategy,
            threshold: self.threshold,
        });
        true
    }

    pub fn is_observed(&self, target: NodeId) -> bool {
        self.observed.contains_key(&target)
    }

    pub fn observed(&self) -> impl Iterator<Item = (NodeId, WatchStrategy)> + '_ {
        self.observed.iter().map(|(n, s)| (*n, *s))
    }

    pub fn is_gated(&self, section: NodeId) -> bool {
        self.gates.contains_key(&section)
    }

    /// Handle one observer entry. Returns the containers to start now; the
    /// target is unobserved on its first qualifying intersection.
    pub fn on_intersection(
        &mut self,
        doc: &Document,
        cfg: &Config,
        ctx: &Context,
        entry: &Intersection,
        timers: &mut TimerQueue,
        outputs: &mut Outputs,
    ) -> Vec<NodeId> {
        if !entry.is_intersecting || entry.ratio < self.threshold {
            return Vec::new();
        }
        let Some(strategy) = self.observed.shift_remove(&entry.target) else {
            return Vec::new();
        };
        outputs.push_event(TypewriterEvent::Unobserve {
            target: entry.target,
        });

        match strategy {
            WatchStrategy::Standalone => vec![entry.target],
            WatchStrategy::Section if ctx.suppressed => {
                let timer = timers.schedule(
                    self.suppression_timeout,
                    TimerKind::SuppressionTimeout(entry.target),
                );
                self.gates.insert(entry.target, timer);
                outputs.push_event(TypewriterEvent::Deferred {
                    section: entry.target,
                    timeout: self.suppression_timeout,
                });
                Vec::new()
            }
            WatchStrategy::Section => containers_in(doc, entry.target, cfg),
        }
    }

    /// The readiness signal bubbles: a signal on any node inside a gated
    /// section opens that section's gate. Returns the section to start.
    pub fn on_ready_signal(
        &mut self,
        doc: &Document,
        target: NodeId,
        timers: &mut TimerQueue,
    ) -> Option<NodeId> {
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if let Some(timer) = self.gates.remove(&node) {
                timers.cancel(timer);
                return Some(node);
            }
            cursor = doc.parent(node);
        }
        None
    }

    /// The timeout won the race. False if the signal already opened the gate.
    pub fn on_timeout(&mut self, section: NodeId) -> bool {
        self.gates.remove(&section).is_some()
    }
}
