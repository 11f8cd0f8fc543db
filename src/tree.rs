//! The parsed document: arena, root, and the label maps.

use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::arena::{Arena, NodeId};
use crate::extension::Enabled;
use crate::inline::{LinkRefMap, LinkReference, normalize_reference_label};
use crate::nodes::{Ast, NodeValue};

/// One step of a depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Enter(NodeId),
    Exit(NodeId),
}

/// A footnote definition and how often it was referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteEntry {
    pub node: NodeId,
    /// Label as written in the definition.
    pub name: String,
    /// 1-based number in first-use order, 0 while unreferenced.
    pub ix: u32,
    pub references: u32,
}

/// Footnote label to definition, plus first-use numbering.
#[derive(Debug, Default, Clone)]
pub struct FootnoteMap {
    defs: HashMap<String, FootnoteEntry>,
    order: Vec<String>,
}

impl FootnoteMap {
    /// Records a definition. The first definition of a label wins.
    pub fn define(&mut self, name: &str, node: NodeId) -> bool {
        let key = normalize_reference_label(name).into_owned();
        if self.defs.contains_key(&key) {
            return false;
        }
        self.defs.insert(
            key,
            FootnoteEntry {
                node,
                name: name.to_owned(),
                ix: 0,
                references: 0,
            },
        );
        true
    }

    /// Counts a reference. Returns the footnote's number and which reference
    /// to it this is, or `None` when the label has no definition.
    pub fn reference(&mut self, name: &str) -> Option<(u32, u32)> {
        let key = normalize_reference_label(name);
        let entry = self.defs.get_mut(&*key)?;
        if entry.ix == 0 {
            self.order.push(key.into_owned());
            entry.ix = self.order.len() as u32;
        }
        entry.references += 1;
        Some((entry.ix, entry.references))
    }

    pub fn get(&self, name: &str) -> Option<&FootnoteEntry> {
        self.defs.get(&*normalize_reference_label(name))
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Referenced definitions in first-use order.
    pub fn referenced(&self) -> impl Iterator<Item = &FootnoteEntry> + '_ {
        self.order.iter().filter_map(|key| self.defs.get(key))
    }
}

/// A finished parse. Immutable; render it as many times as needed.
pub struct Document {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    pub(crate) refs: LinkRefMap,
    pub(crate) footnotes: FootnoteMap,
    pub(crate) enabled: Arc<Enabled>,
}

impl Document {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &Ast {
        self.arena.get(id)
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        self.arena.value(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.parent(id)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena.first_child(id)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena.last_child(id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena.next_sibling(id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena.previous_sibling(id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.arena.children(id)
    }

    /// Pre-order walk of the subtree at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.arena.descendants(id)
    }

    /// Enter/exit walk of the whole document.
    pub fn traverse(&self) -> impl Iterator<Item = Edge> + '_ {
        self.root.traverse(self.arena.raw()).map(|edge| match edge {
            indextree::NodeEdge::Start(id) => Edge::Enter(id),
            indextree::NodeEdge::End(id) => Edge::Exit(id),
        })
    }

    /// Looks up a link reference definition by label.
    pub fn reference(&self, label: &str) -> Option<&LinkReference> {
        self.refs.get(&*normalize_reference_label(label))
    }

    /// Labels of referenced footnotes, in the order they are numbered.
    pub fn footnote_order(&self) -> Vec<&str> {
        self.footnotes.referenced().map(|e| e.name.as_str()).collect()
    }

    /// Number of nodes the parse allocated.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Names of the extensions this document was parsed with.
    pub fn extensions(&self) -> Vec<&'static str> {
        self.enabled.names()
    }

    /// Concatenated text of the inline content under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match self.value(node) {
                NodeValue::Text(s) | NodeValue::Code(s) => out.push_str(s),
                NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
                _ => {}
            }
        }
        out
    }
}

struct SerializeNode<'a> {
    doc: &'a Document,
    id: NodeId,
}

struct SerializeChildren<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl Serialize for SerializeNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ast = self.doc.get(self.id);
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("node", &ast.value)?;
        if ast.sourcepos.start.line > 0 {
            map.serialize_entry("sourcepos", &ast.sourcepos)?;
        }
        if self.doc.first_child(self.id).is_some() {
            map.serialize_entry(
                "children",
                &SerializeChildren {
                    doc: self.doc,
                    id: self.id,
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for SerializeChildren<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for child in self.doc.children(self.id) {
            seq.serialize_element(&SerializeNode {
                doc: self.doc,
                id: child,
            })?;
        }
        seq.end()
    }
}

/// Serializes as a nested `{ node, sourcepos, children }` tree.
impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializeNode {
            doc: self,
            id: self.root,
        }
        .serialize(serializer)
    }
}
