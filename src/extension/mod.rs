//! Syntax extensions and the registry that dispatches to them.
//!
//! Every non-CommonMark construct is an ordinary [`SyntaxExtension`]: the
//! six GitHub extensions shipped here register through the same
//! [`ExtensionRegistry`] API a third party would use. A registry is built
//! once, frozen into a [`FrozenRegistry`], and then shared read-only (behind
//! an `Arc`) by any number of concurrent parses.
//!
//! Dispatch order is `(priority, registration order)`, ascending. The block
//! parser always tries the CommonMark block starts first and consults
//! extensions only when none of those match.

mod autolink;
mod footnote;
mod strikethrough;
mod table;
mod tagfilter;
mod tasklist;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::arena::{Arena, NodeId};
use crate::error::{Error, Result};
use crate::nodes::{Ast, ExtensionNode, NodeKind, NodeValue, Sourcepos};
use crate::options::Options;
use crate::render::RenderContext;
use crate::tree::FootnoteMap;

pub use autolink::Autolink;
pub use footnote::{
    FOOTNOTE_BACKREF, FOOTNOTE_DEFINITION, FOOTNOTE_REFERENCE, FOOTNOTE_SECTION, Footnote,
};
pub use strikethrough::{STRIKETHROUGH, Strikethrough};
pub use table::{TABLE, TABLE_CELL, TABLE_ROW, Table};
pub use tagfilter::Tagfilter;
pub use tasklist::{TASKLIST_ITEM, Tasklist};

/// Default priority. Lower values are consulted first.
pub const DEFAULT_PRIORITY: i32 = 100;

/// What the block parser offers an extension when no core block start
/// matched the current line.
#[derive(Debug)]
pub struct BlockStart<'a> {
    /// Rest of the line from its first non-space character.
    pub line: &'a str,
    /// Columns of indentation before `line`.
    pub indent: usize,
    /// The container new blocks would be added to.
    pub container: &'a NodeValue,
    /// Accumulated content when `container` is an open paragraph.
    pub paragraph: Option<&'a str>,
    /// Whether every open container matched this line.
    pub all_matched: bool,
    pub options: &'a Options,
}

/// A successful extension block start.
#[derive(Debug)]
pub enum BlockOpen {
    /// A container; `advance` bytes of the line are the marker, and block
    /// starts are retried on what follows.
    Container { node: ExtensionNode, advance: usize },
    /// A leaf that accepts the rest of the line and following lines as
    /// content.
    Leaf { node: ExtensionNode, advance: usize },
    /// Converts the open paragraph: its first `retain` bytes stay a
    /// paragraph, and a new leaf with `content` takes over. The current
    /// line is consumed.
    ReplaceParagraph {
        retain: usize,
        node: ExtensionNode,
        content: String,
    },
}

/// One line as seen by an open extension block's continuation test.
#[derive(Debug, Clone, Copy)]
pub struct LineView<'a> {
    pub line: &'a str,
    pub indent: usize,
    pub blank: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// The block stays open; `advance_columns` of indentation belong to it.
    Matched { advance_columns: usize },
    NotMatched,
}

/// Mutable tree access handed to finalize and post-process hooks.
pub struct TreeMut<'a> {
    pub(crate) arena: &'a mut Arena,
    pub(crate) root: NodeId,
    pub(crate) footnotes: &'a mut FootnoteMap,
    pub(crate) options: &'a Options,
}

impl TreeMut<'_> {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> &Options {
        self.options
    }

    pub fn get(&self, id: NodeId) -> &Ast {
        self.arena.get(id)
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        self.arena.value(id)
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.arena.get_mut(id).value
    }

    /// Raw text of a leaf that has not been through the inline phase yet.
    pub fn content(&self, id: NodeId) -> &str {
        &self.arena.get(id).content
    }

    pub fn set_content(&mut self, id: NodeId, content: String) {
        self.arena.get_mut(id).content = content;
    }

    pub fn take_content(&mut self, id: NodeId) -> String {
        std::mem::take(&mut self.arena.get_mut(id).content)
    }

    pub fn alloc(&mut self, value: NodeValue, sourcepos: Sourcepos) -> Result<NodeId> {
        let id = self.arena.alloc(value, sourcepos)?;
        self.arena.get_mut(id).open = false;
        Ok(id)
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.arena.append(parent, child);
    }

    pub fn insert_after(&mut self, node: NodeId, sibling: NodeId) {
        self.arena.insert_after(node, sibling);
    }

    pub fn insert_before(&mut self, node: NodeId, sibling: NodeId) {
        self.arena.insert_before(node, sibling);
    }

    pub fn detach(&mut self, id: NodeId) {
        self.arena.detach(id);
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

    /// Snapshot of the children, safe to hold across edits.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.arena.children(id).collect()
    }

    /// Snapshot of the pre-order walk from `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.arena.descendants(id).collect()
    }

    pub fn footnotes(&self) -> &FootnoteMap {
        self.footnotes
    }

    pub fn footnotes_mut(&mut self) -> &mut FootnoteMap {
        self.footnotes
    }
}

/// Position of the inline scanner, offered to extension inline triggers.
pub struct InlineCursor<'a> {
    pub(crate) input: &'a str,
    pub(crate) pos: usize,
    pub(crate) text_start: usize,
    pub(crate) options: &'a Options,
    pub(crate) footnotes: &'a mut FootnoteMap,
}

impl InlineCursor<'_> {
    pub fn input(&self) -> &str {
        self.input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Input from the trigger byte onward.
    pub fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    /// Literal text scanned since the last emitted node. A match may claim a
    /// suffix of it through [`InlineMatch::rewind`].
    pub fn pending(&self) -> &str {
        &self.input[self.text_start..self.pos]
    }

    pub fn char_before(&self) -> Option<char> {
        self.input[..self.pos].chars().next_back()
    }

    pub fn options(&self) -> &Options {
        self.options
    }

    pub fn footnotes_mut(&mut self) -> &mut FootnoteMap {
        self.footnotes
    }
}

/// A node produced by an extension inline trigger.
#[derive(Debug)]
pub struct InlineMatch {
    /// Bytes of [`InlineCursor::pending`] that belong to the match.
    pub rewind: usize,
    /// Bytes consumed from the cursor onward.
    pub advance: usize,
    pub value: NodeValue,
    /// Literal text child, if any.
    pub text: Option<String>,
}

/// A pluggable syntax bundle. Every hook has a no-op default.
pub trait SyntaxExtension: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Node kinds this extension creates and renders.
    fn node_kinds(&self) -> &'static [NodeKind] {
        &[]
    }

    fn open_block(&self, _start: &BlockStart<'_>) -> Option<BlockOpen> {
        None
    }

    fn continue_block(&self, _node: &ExtensionNode, _line: &LineView<'_>) -> BlockContinue {
        BlockContinue::NotMatched
    }

    fn can_contain(&self, _node: &ExtensionNode, _child: &NodeValue) -> bool {
        false
    }

    /// Whether the node's content goes through the inline parser.
    fn contains_inlines(&self, _node: &ExtensionNode) -> bool {
        false
    }

    fn finalize_block(&self, _tree: &mut TreeMut<'_>, _node: NodeId) -> Result<()> {
        Ok(())
    }

    /// Runs once the block tree is complete, before inline parsing.
    fn postprocess_blocks(&self, _tree: &mut TreeMut<'_>) -> Result<()> {
        Ok(())
    }

    fn inline_triggers(&self) -> &'static [u8] {
        &[]
    }

    fn parse_inline(&self, _cursor: &mut InlineCursor<'_>) -> Option<InlineMatch> {
        None
    }

    /// Byte this extension resolves through the emphasis delimiter stack.
    fn delimiter_char(&self) -> Option<u8> {
        None
    }

    /// Whether a run of `len` delimiter bytes may take part in matching.
    fn accepts_delimiter_run(&self, _len: usize, _options: &Options) -> bool {
        true
    }

    /// Pairs an opener and closer. Returns the number of delimiter bytes
    /// each side gives up and the node that wraps the content.
    fn match_delimiters(
        &self,
        _opener_len: usize,
        _closer_len: usize,
    ) -> Option<(usize, ExtensionNode)> {
        None
    }

    /// Runs after the inline phase.
    fn post_process(&self, _tree: &mut TreeMut<'_>) -> Result<()> {
        Ok(())
    }

    fn render_html(&self, _ctx: &mut RenderContext<'_>, _node: NodeId, _entering: bool) -> Result<()> {
        Ok(())
    }

    /// Filters raw HTML before it is written in unsafe mode.
    fn filter_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(html)
    }
}

/// Append-only builder for a set of extensions.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn SyntaxExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the six GitHub extensions.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        let core: [Box<dyn SyntaxExtension>; 6] = [
            Box::new(Table),
            Box::new(Strikethrough),
            Box::new(Tagfilter),
            Box::new(Tasklist),
            Box::new(Autolink),
            Box::new(Footnote),
        ];
        for ext in core {
            registry.extensions.push(ext);
        }
        registry
    }

    pub fn register<E>(&mut self, extension: E) -> Result<&mut Self>
    where
        E: SyntaxExtension + 'static,
    {
        let name = extension.name();
        if self.extensions.iter().any(|e| e.name() == name) {
            return Err(Error::DuplicateExtension(name.to_owned()));
        }
        self.extensions.push(Box::new(extension));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Ends registration. The result can be shared across threads.
    pub fn freeze(self) -> Arc<FrozenRegistry> {
        let mut by_name = HashMap::with_capacity(self.extensions.len());
        let mut capabilities = HashMap::new();
        for (idx, ext) in self.extensions.iter().enumerate() {
            by_name.insert(ext.name(), idx);
            for &kind in ext.node_kinds() {
                capabilities.entry(kind).or_insert(idx);
            }
        }
        debug!(
            extensions = self.extensions.len(),
            node_kinds = capabilities.len(),
            "extension registry frozen"
        );
        Arc::new(FrozenRegistry {
            extensions: self.extensions,
            by_name,
            capabilities,
        })
    }
}

/// A registry after [`ExtensionRegistry::freeze`]. Read-only.
pub struct FrozenRegistry {
    extensions: Vec<Box<dyn SyntaxExtension>>,
    by_name: HashMap<&'static str, usize>,
    capabilities: HashMap<NodeKind, usize>,
}

impl FrozenRegistry {
    pub fn get(&self, name: &str) -> Option<&dyn SyntaxExtension> {
        self.by_name.get(name).map(|&i| self.extensions[i].as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extensions.iter().map(|e| e.name())
    }

    /// The extension that renders nodes of `kind`.
    pub fn owner_of(&self, kind: NodeKind) -> Option<&dyn SyntaxExtension> {
        self.capabilities
            .get(&kind)
            .map(|&i| self.extensions[i].as_ref())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

static CORE_REGISTRY: LazyLock<Arc<FrozenRegistry>> =
    LazyLock::new(|| ExtensionRegistry::with_core().freeze());

/// The process-wide registry of core extensions.
pub fn core_registry() -> &'static Arc<FrozenRegistry> {
    &CORE_REGISTRY
}

/// The extensions one parser configuration uses, in dispatch order.
pub(crate) struct Enabled {
    registry: Arc<FrozenRegistry>,
    order: Vec<usize>,
    triggers: [bool; 256],
    delimiters: [Option<usize>; 256],
}

impl Enabled {
    pub(crate) fn resolve(registry: &Arc<FrozenRegistry>, options: &Options) -> Result<Self> {
        let mut order = Vec::new();
        for name in options.requested_extensions() {
            let idx = registry
                .index_of(name)
                .ok_or_else(|| Error::UnknownExtension(name.to_owned()))?;
            order.push(idx);
        }
        order.sort_by_key(|&i| (registry.extensions[i].priority(), i));

        let mut triggers = [false; 256];
        let mut delimiters = [None; 256];
        for &idx in &order {
            let ext = &registry.extensions[idx];
            for &b in ext.inline_triggers() {
                triggers[b as usize] = true;
            }
            if let Some(b) = ext.delimiter_char() {
                delimiters[b as usize].get_or_insert(idx);
            }
        }

        Ok(Self {
            registry: Arc::clone(registry),
            order,
            triggers,
            delimiters,
        })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &dyn SyntaxExtension)> + '_ {
        self.order
            .iter()
            .map(|&i| (i, self.registry.extensions[i].as_ref()))
    }

    pub(crate) fn get(&self, idx: usize) -> &dyn SyntaxExtension {
        self.registry.extensions[idx].as_ref()
    }

    pub(crate) fn owner_of(&self, kind: NodeKind) -> Option<&dyn SyntaxExtension> {
        self.registry.owner_of(kind)
    }

    #[inline]
    pub(crate) fn is_trigger(&self, b: u8) -> bool {
        self.triggers[b as usize]
    }

    #[inline]
    pub(crate) fn delimiter_owner(&self, b: u8) -> Option<usize> {
        self.delimiters[b as usize]
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.iter().map(|(_, e)| e.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, i32);

    impl SyntaxExtension for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ExtensionRegistry::with_core();
        let err = registry.register(Named("table", 0)).err().unwrap();
        assert!(matches!(err, Error::DuplicateExtension(name) if name == "table"));
    }

    #[test]
    fn unknown_names_fail_resolution() {
        let registry = ExtensionRegistry::with_core().freeze();
        let opts = Options::default().with_extension("nope");
        assert!(matches!(
            Enabled::resolve(&registry, &opts),
            Err(Error::UnknownExtension(name)) if name == "nope"
        ));
    }

    #[test]
    fn dispatch_order_is_priority_then_registration() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Named("late", 10))
            .unwrap()
            .register(Named("early", 1))
            .unwrap()
            .register(Named("tie", 10))
            .unwrap();
        let registry = registry.freeze();
        let opts = Options::default()
            .with_extension("tie")
            .with_extension("late")
            .with_extension("early");
        let enabled = Enabled::resolve(&registry, &opts).unwrap();
        assert_eq!(enabled.names(), ["early", "late", "tie"]);
    }

    #[test]
    fn capability_table_maps_kinds_to_owners() {
        let registry = core_registry();
        assert_eq!(registry.owner_of(TABLE_CELL).map(|e| e.name()), Some("table"));
        assert_eq!(
            registry.owner_of(FOOTNOTE_REFERENCE).map(|e| e.name()),
            Some("footnote")
        );
        assert!(registry.owner_of(NodeKind("missing")).is_none());
    }

    #[test]
    fn frozen_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrozenRegistry>();
    }
}
