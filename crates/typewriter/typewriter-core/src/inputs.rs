//! Input contracts for the engine.
//!
//! Hosts collect what happened since the previous step (observer callbacks,
//! custom events, animator completions) and pass it to `Engine::update()`.

use serde::{Deserialize, Serialize};

use crate::ids::{AnimationHandle, NodeId};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Inputs {
    /// Intersection observer entries for watched targets.
    #[serde(default)]
    pub intersections: Vec<Intersection>,
    /// Custom events dispatched on page nodes.
    #[serde(default)]
    pub signals: Vec<SignalInput>,
    /// Animations whose completion callback fired.
    #[serde(default)]
    pub completed: Vec<AnimationHandle>,
    /// The host changed the page outside of the engine's document.
    #[serde(default)]
    pub mutated: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Intersection {
    pub target: NodeId,
    pub is_intersecting: bool,
    /// Visible fraction of the target in [0, 1].
    pub ratio: f32,
}

impl Intersection {
    pub fn visible(target: NodeId, ratio: f32) -> Self {
        Self {
            target,
            is_intersecting: ratio > 0.0,
            ratio,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SignalInput {
    pub target: NodeId,
    pub signal: Signal,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    /// The link-highlighting subsystem finished with a section.
    InflectionReady,
}
