//! GitHub footnotes.
//!
//! `[^label]: text` opens a definition container; indented lines continue
//! it. `[^label]` in running text becomes a numbered reference when a
//! definition with that label exists. After the inline phase, referenced
//! definitions move into one trailing section in first-reference order,
//! each followed by a back-reference per use. Unreferenced definitions are
//! dropped.

use std::fmt::Write;

use tracing::debug;

use super::{
    BlockContinue, BlockOpen, BlockStart, InlineCursor, InlineMatch, LineView, SyntaxExtension,
    TreeMut,
};
use crate::arena::NodeId;
use crate::error::Result;
use crate::nodes::{ExtensionNode, ExtensionPayload, NodeKind, NodeValue, Sourcepos};
use crate::render::RenderContext;

pub const FOOTNOTE_DEFINITION: NodeKind = NodeKind("footnote_definition");
pub const FOOTNOTE_REFERENCE: NodeKind = NodeKind("footnote_reference");
pub const FOOTNOTE_SECTION: NodeKind = NodeKind("footnote_section");
pub const FOOTNOTE_BACKREF: NodeKind = NodeKind("footnote_backref");

#[derive(Debug, Default, Clone, Copy)]
pub struct Footnote;

impl SyntaxExtension for Footnote {
    fn name(&self) -> &'static str {
        "footnote"
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[
            FOOTNOTE_DEFINITION,
            FOOTNOTE_REFERENCE,
            FOOTNOTE_SECTION,
            FOOTNOTE_BACKREF,
        ]
    }

    fn open_block(&self, start: &BlockStart<'_>) -> Option<BlockOpen> {
        if start.indent >= 4 {
            return None;
        }
        let (label, len) = scan_label(start.line)?;
        if start.line.as_bytes().get(len) != Some(&b':') {
            return None;
        }
        Some(BlockOpen::Container {
            node: ExtensionNode::new(
                FOOTNOTE_DEFINITION,
                ExtensionPayload::FootnoteDefinition {
                    name: label.to_owned(),
                    ix: 0,
                    total_references: 0,
                },
            ),
            advance: len + 1,
        })
    }

    fn continue_block(&self, node: &ExtensionNode, line: &LineView<'_>) -> BlockContinue {
        if node.kind != FOOTNOTE_DEFINITION {
            BlockContinue::NotMatched
        } else if line.indent >= 4 {
            BlockContinue::Matched { advance_columns: 4 }
        } else if line.blank {
            BlockContinue::Matched { advance_columns: 0 }
        } else {
            BlockContinue::NotMatched
        }
    }

    fn can_contain(&self, node: &ExtensionNode, child: &NodeValue) -> bool {
        node.kind == FOOTNOTE_DEFINITION
            && !matches!(child, NodeValue::Item(_) | NodeValue::Document)
            && (child.is_block() || matches!(child, NodeValue::Extension(_)))
    }

    fn finalize_block(&self, tree: &mut TreeMut<'_>, node: NodeId) -> Result<()> {
        if let NodeValue::Extension(ExtensionNode {
            payload: ExtensionPayload::FootnoteDefinition { name, .. },
            ..
        }) = tree.value(node)
        {
            let name = name.clone();
            if !tree.footnotes_mut().define(&name, node) {
                debug!(label = %name, "duplicate footnote definition ignored");
            }
        }
        Ok(())
    }

    fn inline_triggers(&self) -> &'static [u8] {
        b"["
    }

    fn parse_inline(&self, cursor: &mut InlineCursor<'_>) -> Option<InlineMatch> {
        let (label, len) = scan_label(cursor.rest())?;
        let label = label.to_owned();
        let footnotes = cursor.footnotes_mut();
        let (ix, ref_num) = footnotes.reference(&label)?;
        let name = footnotes.get(&label)?.name.clone();
        Some(InlineMatch {
            rewind: 0,
            advance: len,
            value: NodeValue::Extension(ExtensionNode::new(
                FOOTNOTE_REFERENCE,
                ExtensionPayload::FootnoteReference { name, ix, ref_num },
            )),
            text: None,
        })
    }

    fn post_process(&self, tree: &mut TreeMut<'_>) -> Result<()> {
        let definitions: Vec<NodeId> = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|&id| tree.value(id).extension_kind() == Some(FOOTNOTE_DEFINITION))
            .collect();
        if definitions.is_empty() {
            return Ok(());
        }

        let mut kept = Vec::new();
        for def in definitions {
            tree.detach(def);
            let NodeValue::Extension(ExtensionNode {
                payload: ExtensionPayload::FootnoteDefinition { name, .. },
                ..
            }) = tree.value(def)
            else {
                continue;
            };
            let Some(entry) = tree.footnotes().get(name) else {
                continue;
            };
            if entry.node != def || entry.ix == 0 {
                continue;
            }
            let (ix, references, name) = (entry.ix, entry.references, entry.name.clone());
            *tree.value_mut(def) = NodeValue::Extension(ExtensionNode::new(
                FOOTNOTE_DEFINITION,
                ExtensionPayload::FootnoteDefinition {
                    name: name.clone(),
                    ix,
                    total_references: references,
                },
            ));
            kept.push((ix, def, name, references));
        }
        debug!(referenced = kept.len(), "footnote section");
        if kept.is_empty() {
            return Ok(());
        }
        kept.sort_by_key(|&(ix, ..)| ix);

        let section = tree.alloc(
            NodeValue::Extension(ExtensionNode::new(FOOTNOTE_SECTION, ExtensionPayload::None)),
            Sourcepos::default(),
        )?;
        tree.append(tree.root(), section);

        for (ix, def, name, references) in kept {
            tree.append(section, def);
            let target = match tree.last_child(def) {
                Some(last) if matches!(tree.value(last), NodeValue::Paragraph) => {
                    let space = tree.alloc(NodeValue::Text(" ".to_owned()), Sourcepos::default())?;
                    tree.append(last, space);
                    last
                }
                _ => def,
            };
            for ref_num in 1..=references {
                let backref = tree.alloc(
                    NodeValue::Extension(ExtensionNode::new(
                        FOOTNOTE_BACKREF,
                        ExtensionPayload::FootnoteBackref {
                            name: name.clone(),
                            ix,
                            ref_num,
                        },
                    )),
                    Sourcepos::default(),
                )?;
                tree.append(target, backref);
            }
        }
        Ok(())
    }

    fn render_html(&self, ctx: &mut RenderContext<'_>, node: NodeId, entering: bool) -> Result<()> {
        let NodeValue::Extension(ext) = ctx.value(node) else {
            return Ok(());
        };
        match (&ext.payload, entering) {
            (ExtensionPayload::None, true) => {
                ctx.cr();
                ctx.write_str("<section class=\"footnotes\">\n<ol>\n");
            }
            (ExtensionPayload::None, false) => ctx.write_str("</ol>\n</section>\n"),
            (ExtensionPayload::FootnoteDefinition { ix, .. }, true) => {
                ctx.cr();
                write!(ctx.out(), "<li id=\"fn{ix}\">\n")?;
            }
            (ExtensionPayload::FootnoteDefinition { .. }, false) => {
                ctx.cr();
                ctx.write_str("</li>\n");
            }
            (ExtensionPayload::FootnoteReference { ix, ref_num, .. }, true) => {
                write!(ctx.out(), "<sup class=\"footnote-ref\"><a href=\"#fn{ix}\" id=\"fnref{ix}")?;
                if *ref_num > 1 {
                    write!(ctx.out(), "-{ref_num}")?;
                }
                write!(ctx.out(), "\">{ix}</a></sup>")?;
            }
            (ExtensionPayload::FootnoteBackref { ix, ref_num, .. }, true) => {
                if *ref_num == 1 {
                    write!(
                        ctx.out(),
                        "<a href=\"#fnref{ix}\" class=\"footnote-backref\">\u{21A9}</a>"
                    )?;
                } else {
                    write!(
                        ctx.out(),
                        " <a href=\"#fnref{ix}-{ref_num}\" class=\"footnote-backref\">\
                         \u{21A9}<sup class=\"footnote-ref\">{ref_num}</sup></a>"
                    )?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// `[^label]` at the start of `s`. Returns the label and the length up to
/// and including `]`.
fn scan_label(s: &str) -> Option<(&str, usize)> {
    let rest = s.strip_prefix("[^")?;
    let close = rest.find(|c: char| c == ']' || c == '[' || c.is_whitespace())?;
    if close == 0 || close > 999 || !rest[close..].starts_with(']') {
        return None;
    }
    Some((&rest[..close], close + 3))
}
