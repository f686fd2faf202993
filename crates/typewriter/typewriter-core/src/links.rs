//! Link extraction and preservation.
//!
//! Clearing a block to retype it would drop every anchor inside it. Before
//! that happens each block is given a policy: keep the links it already
//! owns, take over the container's pool of loose links, or get none. Every
//! href ends up in the container exactly once.

use hashbrown::HashSet;

use crate::dom::Document;
use crate::ids::NodeId;

pub const LINK_TAG: &str = "a";

/// Anchors inside `node`, in document order.
pub fn links_in(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.elements_by_tag(node, LINK_TAG)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkPolicy {
    /// The block already holds these links; they stay with it.
    KeepOwn(Vec<NodeId>),
    /// The block took over the container's loose links.
    ClaimPool(Vec<NodeId>),
    None,
}

impl LinkPolicy {
    pub fn links(&self) -> &[NodeId] {
        match self {
            LinkPolicy::KeepOwn(links) | LinkPolicy::ClaimPool(links) => links,
            LinkPolicy::None => &[],
        }
    }
}

/// Link bookkeeping for one container.
#[derive(Clone, Debug, Default)]
pub struct LinkLedger {
    pool: Vec<NodeId>,
    pool_claimed: bool,
    duplicates: Vec<NodeId>,
}

impl LinkLedger {
    /// Build the ledger before any block is touched. Hrefs of links already
    /// inside blocks are claimed first, in block order; loose links then
    /// form the pool, keyed by href. Anything whose href was already seen is
    /// a duplicate to be dropped.
    pub fn build(doc: &Document, container: NodeId, blocks: &[NodeId]) -> Self {
        Self::build_with_settled(doc, container, blocks, &[])
    }

    /// Like [`LinkLedger::build`], with `settled` blocks that were typed
    /// earlier (for example by a nested container). Their links are neither
    /// pooled nor dropped, but their hrefs count as seen.
    pub fn build_with_settled(
        doc: &Document,
        container: NodeId,
        blocks: &[NodeId],
        settled: &[NodeId],
    ) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates = Vec::new();
        let mut owning: Vec<NodeId> = Vec::new();

        for block in settled {
            for link in links_in(doc, *block) {
                if let Some(href) = doc.attr(link, "href") {
                    seen.insert(href.to_string());
                }
            }
        }

        for block in blocks {
            let own = links_in(doc, *block);
            if own.is_empty() {
                continue;
            }
            owning.push(*block);
            for link in own {
                if let Some(href) = doc.attr(link, "href") {
                    if !seen.insert(href.to_string()) {
                        duplicates.push(link);
                    }
                }
            }
        }

        let mut pool = Vec::new();
        for link in links_in(doc, container) {
            if owning
                .iter()
                .chain(settled)
                .any(|b| doc.contains(*b, link))
            {
                continue;
            }
            let Some(href) = doc.attr(link, "href") else {
                continue;
            };
            if seen.insert(href.to_string()) {
                pool.push(link);
            } else {
                duplicates.push(link);
            }
        }

        Self {
            pool,
            pool_claimed: false,
            duplicates,
        }
    }

    pub fn pool(&self) -> &[NodeId] {
        &self.pool
    }

    pub fn is_pool_claimed(&self) -> bool {
        self.pool_claimed
    }

    pub fn duplicates(&self) -> &[NodeId] {
        &self.duplicates
    }

    /// Decide which links `block` keeps. Must be called in document order,
    /// before the block is cleared.
    pub fn resolve(&mut self, doc: &Document, block: NodeId) -> LinkPolicy {
        let own = links_in(doc, block);
        if !own.is_empty() {
            let kept: Vec<NodeId> = own
                .into_iter()
                .filter(|l| !self.duplicates.contains(l))
                .collect();
            return LinkPolicy::KeepOwn(kept);
        }
        let has_text = !doc.text_content(block).trim().is_empty();
        if has_text && !self.pool_claimed && !self.pool.is_empty() {
            self.pool_claimed = true;
            return LinkPolicy::ClaimPool(self.pool.clone());
        }
        LinkPolicy::None
    }
}
