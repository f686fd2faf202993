//! Per-node progress markers owned by the engine instead of the page.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Unregistered,
    /// Handed to the visibility scheduler.
    Registered,
    /// Typing began; never leaves this state.
    Started,
}

#[derive(Debug, Default)]
pub struct Markers {
    nodes: HashMap<NodeId, Status>,
    started_blocks: HashSet<NodeId>,
}

impl Markers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, node: NodeId) -> Status {
        self.nodes.get(&node).copied().unwrap_or_default()
    }

    /// Unregistered → Registered. False if the node was already past that.
    pub fn mark_registered(&mut self, node: NodeId) -> bool {
        let slot = self.nodes.entry(node).or_default();
        if *slot != Status::Unregistered {
            return false;
        }
        *slot = Status::Registered;
        true
    }

    /// Any → Started. False if it was already started.
    pub fn mark_started(&mut self, node: NodeId) -> bool {
        let slot = self.nodes.entry(node).or_default();
        if *slot == Status::Started {
            return false;
        }
        *slot = Status::Started;
        true
    }

    pub fn is_started(&self, node: NodeId) -> bool {
        self.status(node) == Status::Started
    }

    pub fn mark_block_started(&mut self, block: NodeId) -> bool {
        self.started_blocks.insert(block)
    }

    pub fn block_started(&self, block: NodeId) -> bool {
        self.started_blocks.contains(&block)
    }
}
