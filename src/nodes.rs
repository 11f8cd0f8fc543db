//! Node payloads stored in the document arena.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A line/column position, both 1-based. Columns count bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// The source span a block covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sourcepos {
    pub start: LineColumn,
    pub end: LineColumn,
}

impl Sourcepos {
    pub(crate) fn starting_at(line: usize, column: usize) -> Self {
        Self {
            start: LineColumn { line, column },
            end: LineColumn { line, column },
        }
    }
}

impl fmt::Display for Sourcepos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Bullet,
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListDelimType {
    Period,
    Paren,
}

/// Shared by lists and their items. Items carry the marker data that decided
/// which list they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeList {
    pub list_type: ListType,
    /// Columns of indentation before the marker.
    pub marker_offset: usize,
    /// Marker width plus the spaces after it.
    pub padding: usize,
    pub start: u32,
    pub delimiter: ListDelimType,
    pub bullet_char: u8,
    pub tight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeCodeBlock {
    pub fenced: bool,
    pub fence_char: u8,
    pub fence_length: usize,
    pub fence_offset: usize,
    pub info: String,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHtmlBlock {
    /// Which of the seven CommonMark start conditions opened the block.
    pub block_type: u8,
    pub literal: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeHeading {
    pub level: u8,
    pub setext: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeLink {
    pub url: String,
    pub title: String,
}

/// Column alignment from a table delimiter row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl TableAlignment {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}

/// Tag identifying which extension owns a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeKind(pub &'static str);

impl NodeKind {
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Payload for third-party extensions; compared by identity.
#[derive(Clone)]
pub struct OpaquePayload(pub Arc<dyn Any + Send + Sync>);

impl fmt::Debug for OpaquePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpaquePayload(..)")
    }
}

impl PartialEq for OpaquePayload {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtensionPayload {
    None,
    Table {
        alignments: Vec<TableAlignment>,
    },
    TableRow {
        header: bool,
    },
    TableCell {
        alignment: TableAlignment,
        header: bool,
    },
    TaskItem {
        checked: bool,
        list: NodeList,
    },
    FootnoteDefinition {
        name: String,
        ix: u32,
        total_references: u32,
    },
    FootnoteReference {
        name: String,
        ix: u32,
        ref_num: u32,
    },
    FootnoteBackref {
        name: String,
        ix: u32,
        ref_num: u32,
    },
    Literal {
        text: String,
    },
    #[serde(skip)]
    Opaque(OpaquePayload),
}

/// A node owned by an extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionNode {
    pub kind: NodeKind,
    pub payload: ExtensionPayload,
}

impl ExtensionNode {
    pub fn new(kind: NodeKind, payload: ExtensionPayload) -> Self {
        Self { kind, payload }
    }
}

/// The type tag and payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeValue {
    Document,
    BlockQuote,
    List(NodeList),
    Item(NodeList),
    CodeBlock(NodeCodeBlock),
    HtmlBlock(NodeHtmlBlock),
    Paragraph,
    Heading(NodeHeading),
    ThematicBreak,
    Text(String),
    SoftBreak,
    LineBreak,
    Code(String),
    HtmlInline(String),
    Emph,
    Strong,
    Link(NodeLink),
    Image(NodeLink),
    Extension(ExtensionNode),
}

impl NodeValue {
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::BlockQuote
                | Self::List(_)
                | Self::Item(_)
                | Self::CodeBlock(_)
                | Self::HtmlBlock(_)
                | Self::Paragraph
                | Self::Heading(_)
                | Self::ThematicBreak
        )
    }

    /// Text payload for literal-carrying nodes.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Code(s) | Self::HtmlInline(s) => Some(s),
            Self::CodeBlock(c) => Some(&c.literal),
            Self::HtmlBlock(h) => Some(&h.literal),
            _ => None,
        }
    }

    pub fn extension_kind(&self) -> Option<NodeKind> {
        match self {
            Self::Extension(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// A node as stored in the arena.
#[derive(Debug, Clone)]
pub struct Ast {
    pub value: NodeValue,
    pub sourcepos: Sourcepos,
    /// Cleared once the block parser finalizes the node.
    pub open: bool,
    /// Raw inline content of a leaf between the block and inline phases.
    pub(crate) content: String,
    pub(crate) last_line_blank: bool,
}

impl Ast {
    pub(crate) fn new(value: NodeValue, sourcepos: Sourcepos) -> Self {
        Self {
            value,
            sourcepos,
            open: true,
            content: String::new(),
            last_line_blank: false,
        }
    }
}
