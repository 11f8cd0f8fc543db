use tracing::trace;

use super::{SyntaxExtension, TreeMut};
use crate::arena::NodeId;
use crate::error::Result;
use crate::nodes::{ExtensionNode, ExtensionPayload, NodeKind, NodeValue};
use crate::render::RenderContext;

pub const TASKLIST_ITEM: NodeKind = NodeKind("tasklist_item");

/// `- [ ] todo` and `- [x] done`. Runs over the finished block tree and
/// turns matching list items into task items.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tasklist;

impl SyntaxExtension for Tasklist {
    fn name(&self) -> &'static str {
        "tasklist"
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[TASKLIST_ITEM]
    }

    fn postprocess_blocks(&self, tree: &mut TreeMut<'_>) -> Result<()> {
        for item in tree.descendants(tree.root()) {
            let NodeValue::Item(list) = *tree.value(item) else {
                continue;
            };
            let Some(para) = tree.first_child(item) else {
                continue;
            };
            if !matches!(tree.value(para), NodeValue::Paragraph) {
                continue;
            }
            let Some(checked) = task_marker(tree.content(para)) else {
                continue;
            };

            let rest = &tree.content(para)[3..];
            let rest = rest.strip_prefix([' ', '\t']).unwrap_or(rest).to_owned();
            tree.set_content(para, rest);
            *tree.value_mut(item) = NodeValue::Extension(ExtensionNode::new(
                TASKLIST_ITEM,
                ExtensionPayload::TaskItem { checked, list },
            ));
            trace!(checked, "task list item");
        }
        Ok(())
    }

    fn render_html(&self, ctx: &mut RenderContext<'_>, node: NodeId, entering: bool) -> Result<()> {
        if !entering {
            ctx.write_str("</li>\n");
            return Ok(());
        }
        let checked = matches!(
            ctx.value(node),
            NodeValue::Extension(ExtensionNode {
                payload: ExtensionPayload::TaskItem { checked: true, .. },
                ..
            })
        );
        ctx.cr();
        ctx.write_str("<li");
        ctx.write_sourcepos(node)?;
        ctx.write_str(if checked {
            "><input type=\"checkbox\" checked=\"\" disabled=\"\" /> "
        } else {
            "><input type=\"checkbox\" disabled=\"\" /> "
        });
        Ok(())
    }
}

/// `Some(checked)` when the text opens with `[ ]`, `[x]` or `[X]` followed
/// by whitespace.
fn task_marker(content: &str) -> Option<bool> {
    let b = content.as_bytes();
    if b.len() < 4 || b[0] != b'[' || b[2] != b']' || !matches!(b[3], b' ' | b'\t' | b'\n') {
        return None;
    }
    match b[1] {
        b' ' => Some(false),
        b'x' | b'X' => Some(true),
        _ => None,
    }
}
