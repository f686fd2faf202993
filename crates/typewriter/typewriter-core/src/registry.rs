use hashbrown::HashMap;

use crate::ids::{AnimationHandle, NodeId};

/// Container → in-flight animation. An entry exists only while a job runs;
/// it is consulted solely for teardown.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    entries: HashMap<NodeId, AnimationHandle>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, section: NodeId, handle: AnimationHandle) -> Option<AnimationHandle> {
        self.entries.insert(section, handle)
    }

    /// Remove the entry only if it still points at `handle`.
    pub fn remove(&mut self, section: NodeId, handle: AnimationHandle) -> bool {
        if self.entries.get(&section) == Some(&handle) {
            self.entries.remove(&section);
            return true;
        }
        false
    }

    pub fn get(&self, section: NodeId) -> Option<AnimationHandle> {
        self.entries.get(&section).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (NodeId, AnimationHandle)> + '_ {
        self.entries.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_do_not_evict_newer_entries() {
        let mut reg = InstanceRegistry::new();
        reg.insert(NodeId(1), AnimationHandle(10));
        reg.insert(NodeId(1), AnimationHandle(11));
        assert!(!reg.remove(NodeId(1), AnimationHandle(10)));
        assert_eq!(reg.get(NodeId(1)), Some(AnimationHandle(11)));
        assert!(reg.remove(NodeId(1), AnimationHandle(11)));
        assert!(reg.is_empty());
    }
}
