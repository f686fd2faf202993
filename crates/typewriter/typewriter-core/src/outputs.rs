//! Output contracts from the engine.
//!
//! Events tell the host what to observe and what happened; adapters turn
//! them into observer calls and DOM custom events.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::ids::{AnimationHandle, NodeId};
use crate::scheduler::WatchStrategy;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub enum TypewriterEvent {
    /// Start watching `target` for intersection.
    Observe {
        target: NodeId,
        strategy: WatchStrategy,
        threshold: f32,
    },
    Unobserve {
        target: NodeId,
    },
    /// A visible section is waiting for the inflection-ready signal.
    Deferred {
        section: NodeId,
        timeout: u64,
    },
    SectionStarted {
        section: NodeId,
        blocks: usize,
    },
    JobStarted {
        section: NodeId,
        block: NodeId,
        index: usize,
        handle: AnimationHandle,
    },
    JobFinished {
        section: NodeId,
        index: usize,
        handle: AnimationHandle,
    },
    /// The animator refused a job; the block shows its text statically.
    FallbackRendered {
        section: NodeId,
        block: NodeId,
        index: usize,
    },
    /// Dispatched once per container after its last block (plus grace delay).
    TypewriterReady {
        section: NodeId,
        bubbles: bool,
    },
    StyleInjected {
        node: NodeId,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub events: Vec<TypewriterEvent>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
        self.diagnostics.clear();
    }

    #[inline]
    pub fn push_event(&mut self, event: TypewriterEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.diagnostics.is_empty()
    }

    /// Sections that announced readiness during this step.
    pub fn ready_sections(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TypewriterEvent::TypewriterReady { section, .. } => Some(*section),
                _ => None,
            })
            .collect()
    }
}
