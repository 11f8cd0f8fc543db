#![deny(clippy::undocumented_unsafe_blocks)]

//! # gfmark
//!
//! A CommonMark 0.31 and GitHub Flavored Markdown to HTML engine with a
//! pluggable extension registry.
//!
//! ## Usage
//!
//! ```
//! use gfmark::{markdown_to_html, Options};
//!
//! // Plain CommonMark
//! let html = markdown_to_html("# Hello, **world**!", &Options::default()).unwrap();
//! assert_eq!(html, "<h1>Hello, <strong>world</strong>!</h1>\n");
//!
//! // Every GitHub extension
//! let html = markdown_to_html("~~gone~~", &Options::gfm()).unwrap();
//! assert_eq!(html, "<p><del>gone</del></p>\n");
//! ```
//!
//! Parsing and rendering are separate steps when the tree is needed:
//!
//! ```
//! use gfmark::{core_registry, render_html, NodeValue, Options, Parser};
//!
//! let opts = Options::default().with_extension("table");
//! let parser = Parser::new(core_registry(), &opts).unwrap();
//! let doc = parser.parse("| a |\n| - |\n| b |").unwrap();
//! let first = doc.first_child(doc.root()).unwrap();
//! assert!(matches!(doc.value(first), NodeValue::Extension(_)));
//! let html = render_html(&doc, &opts).unwrap();
//! assert!(html.starts_with("<table>"));
//! ```
//!
//! ## Extensions
//!
//! | Name | Syntax | HTML |
//! |---|---|---|
//! | `table` | `\| a \| b \|` | `<table>` |
//! | `strikethrough` | `~~text~~` | `<del>` |
//! | `tagfilter` | `<script>` in raw HTML | `&lt;script>` |
//! | `tasklist` | `- [x] done` | checkbox |
//! | `autolink` | bare `www.`/`https://`/email | `<a>` |
//! | `footnote` | `[^1]` and `[^1]: text` | footnote section |
//!
//! Third-party extensions implement [`SyntaxExtension`] and register on an
//! [`ExtensionRegistry`] next to (or instead of) the core six.

mod arena;
mod block;
mod buffer;
mod entities;
mod error;
pub mod extension;
mod html;
mod inline;
mod nodes;
mod options;
mod parser;
mod render;
mod smart;
mod tree;

pub use arena::NodeId;
pub use buffer::Buffer;
pub use error::{Error, Result};
pub use extension::{
    BlockContinue, BlockOpen, BlockStart, ExtensionRegistry, FrozenRegistry, InlineCursor,
    InlineMatch, LineView, SyntaxExtension, TreeMut, core_registry,
};
pub use inline::LinkReference;
pub use nodes::{
    Ast, ExtensionNode, ExtensionPayload, LineColumn, ListDelimType, ListType, NodeCodeBlock,
    NodeHeading, NodeHtmlBlock, NodeKind, NodeLink, NodeList, NodeValue, OpaquePayload,
    Sourcepos, TableAlignment,
};
pub use options::{CORE_EXTENSIONS, DEFAULT_MAX_NODES, OptionFlags, Options};
pub use parser::Parser;
pub use render::{HtmlRenderer, RenderContext, render_html};
pub use tree::{Document, Edge, FootnoteEntry, FootnoteMap};

#[inline(always)]
pub(crate) fn is_ascii_punctuation(b: u8) -> bool {
    matches!(b, b'!'..=b'/' | b':'..=b'@' | b'['..=b'`' | b'{'..=b'~')
}

/// Parses and renders `input` with the core extension registry.
pub fn markdown_to_html(input: &str, options: &Options) -> Result<String> {
    let doc = Parser::new(core_registry(), options)?.parse(input)?;
    render_html(&doc, options)
}

/// Like [`markdown_to_html`] for input that may not be valid UTF-8.
pub fn markdown_to_html_bytes(input: &[u8], options: &Options) -> Result<String> {
    let doc = Parser::new(core_registry(), options)?.parse_bytes(input)?;
    render_html(&doc, options)
}
