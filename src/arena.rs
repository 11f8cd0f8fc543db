//! Node storage for one parse.
//!
//! Every node of a document lives in a single [`indextree`] arena and is
//! addressed by a [`NodeId`]. Parent, child and sibling links are handles into
//! the same arena, so splicing during inline resolution is O(1) and the whole
//! tree is freed at once when the [`Document`](crate::Document) is dropped.

use indextree::Arena as IndexArena;
pub use indextree::NodeId;
use tracing::warn;

use crate::error::{Error, Result};
use crate::nodes::{Ast, NodeValue, Sourcepos};

pub struct Arena {
    nodes: IndexArena<Ast>,
    limit: usize,
}

impl Arena {
    pub fn new(limit: usize) -> Self {
        Self {
            nodes: IndexArena::new(),
            limit,
        }
    }

    /// Allocates a detached node. Fails once the ceiling is reached.
    pub fn alloc(&mut self, value: NodeValue, sourcepos: Sourcepos) -> Result<NodeId> {
        if self.nodes.len() >= self.limit {
            warn!(limit = self.limit, "node arena exhausted, aborting parse");
            return Err(Error::ArenaExhausted { limit: self.limit });
        }
        Ok(self.nodes.new_node(Ast::new(value, sourcepos)))
    }

    /// Number of nodes ever allocated, detached ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Ast {
        self.nodes[id].get()
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Ast {
        self.nodes[id].get_mut()
    }

    #[inline]
    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.get(id).value
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.nodes);
    }

    pub fn insert_after(&mut self, node: NodeId, sibling: NodeId) {
        node.insert_after(sibling, &mut self.nodes);
    }

    pub fn insert_before(&mut self, node: NodeId, sibling: NodeId) {
        node.insert_before(sibling, &mut self.nodes);
    }

    /// Unlinks `id` (with its subtree) from its parent and siblings.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.nodes);
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent()
    }

    #[inline]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].first_child()
    }

    #[inline]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].last_child()
    }

    #[inline]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next_sibling()
    }

    #[inline]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].previous_sibling()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.nodes)
    }

    /// Pre-order walk starting at (and including) `id`.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.nodes)
    }

    pub(crate) fn raw(&self) -> &IndexArena<Ast> {
        &self.nodes
    }
}
