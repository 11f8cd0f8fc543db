use tracing::trace;

use super::{BlockContinue, BlockOpen, BlockStart, LineView, SyntaxExtension, TreeMut};
use crate::arena::NodeId;
use crate::error::Result;
use crate::nodes::{
    ExtensionNode, ExtensionPayload, LineColumn, NodeKind, NodeValue, Sourcepos, TableAlignment,
};
use crate::options::OptionFlags;
use crate::render::RenderContext;

pub const TABLE: NodeKind = NodeKind("table");
pub const TABLE_ROW: NodeKind = NodeKind("table_row");
pub const TABLE_CELL: NodeKind = NodeKind("table_cell");

/// Pipe tables. The header row is the last line of an open paragraph and the
/// delimiter row must have the same number of cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct Table;

impl SyntaxExtension for Table {
    fn name(&self) -> &'static str {
        "table"
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[TABLE, TABLE_ROW, TABLE_CELL]
    }

    fn open_block(&self, start: &BlockStart<'_>) -> Option<BlockOpen> {
        let paragraph = start.paragraph?;
        if start.indent >= 4 {
            return None;
        }
        let alignments = parse_delimiter_row(start.line)?;

        let body = paragraph.trim_end_matches('\n');
        let header_start = body.rfind('\n').map_or(0, |i| i + 1);
        let header = &body[header_start..];
        if split_row(header).len() != alignments.len() {
            return None;
        }
        trace!(columns = alignments.len(), "table header accepted");

        Some(BlockOpen::ReplaceParagraph {
            retain: header_start,
            node: ExtensionNode::new(TABLE, ExtensionPayload::Table { alignments }),
            content: format!("{header}\n"),
        })
    }

    fn continue_block(&self, node: &ExtensionNode, line: &LineView<'_>) -> BlockContinue {
        if node.kind == TABLE && !line.blank {
            BlockContinue::Matched { advance_columns: 0 }
        } else {
            BlockContinue::NotMatched
        }
    }

    fn contains_inlines(&self, node: &ExtensionNode) -> bool {
        node.kind == TABLE_CELL
    }

    /// Splits the collected lines into rows and cells. The first line is the
    /// header; body rows are padded or cut to the header's width.
    fn finalize_block(&self, tree: &mut TreeMut<'_>, node: NodeId) -> Result<()> {
        let alignments = match tree.value(node) {
            NodeValue::Extension(ExtensionNode {
                payload: ExtensionPayload::Table { alignments },
                ..
            }) => alignments.clone(),
            _ => return Ok(()),
        };
        let content = tree.take_content(node);
        let first_line = tree.get(node).sourcepos.start.line;

        for (i, line) in content.lines().enumerate() {
            let header = i == 0;
            // The delimiter row sits between the header and the body.
            let line_number = if header { first_line } else { first_line + i + 1 };
            let pos = Sourcepos {
                start: LineColumn {
                    line: line_number,
                    column: 1,
                },
                end: LineColumn {
                    line: line_number,
                    column: line.len(),
                },
            };

            let row = tree.alloc(
                NodeValue::Extension(ExtensionNode::new(
                    TABLE_ROW,
                    ExtensionPayload::TableRow { header },
                )),
                pos,
            )?;
            tree.append(node, row);

            let mut cells = split_row(line).into_iter();
            for &alignment in &alignments {
                let cell = tree.alloc(
                    NodeValue::Extension(ExtensionNode::new(
                        TABLE_CELL,
                        ExtensionPayload::TableCell { alignment, header },
                    )),
                    pos,
                )?;
                tree.set_content(cell, cells.next().unwrap_or_default());
                tree.append(row, cell);
            }
        }
        Ok(())
    }

    fn render_html(&self, ctx: &mut RenderContext<'_>, node: NodeId, entering: bool) -> Result<()> {
        let doc = ctx.document();
        let NodeValue::Extension(ext) = doc.value(node) else {
            return Ok(());
        };
        match (&ext.payload, entering) {
            (ExtensionPayload::Table { .. }, true) => {
                ctx.cr();
                ctx.write_str("<table");
                ctx.write_sourcepos(node)?;
                ctx.write_str(">\n");
            }
            (ExtensionPayload::Table { .. }, false) => {
                let has_body = doc.children(node).any(|row| !is_header_row(doc.value(row)));
                if has_body {
                    ctx.cr();
                    ctx.write_str("</tbody>\n");
                }
                ctx.cr();
                ctx.write_str("</table>\n");
            }
            (ExtensionPayload::TableRow { header }, true) => {
                ctx.cr();
                if *header {
                    ctx.write_str("<thead>\n");
                } else {
                    let first_body = doc
                        .previous_sibling(node)
                        .is_none_or(|prev| is_header_row(doc.value(prev)));
                    if first_body {
                        ctx.write_str("<tbody>\n");
                    }
                }
                ctx.write_str("<tr");
                ctx.write_sourcepos(node)?;
                ctx.write_str(">");
            }
            (ExtensionPayload::TableRow { header }, false) => {
                ctx.cr();
                ctx.write_str("</tr>");
                if *header {
                    ctx.cr();
                    ctx.write_str("</thead>");
                }
                ctx.cr();
            }
            (ExtensionPayload::TableCell { alignment, header }, true) => {
                ctx.cr();
                ctx.write_str(if *header { "<th" } else { "<td" });
                if let Some(align) = alignment.as_str() {
                    if ctx.options().has(OptionFlags::TABLE_PREFER_STYLE_ATTRIBUTES) {
                        ctx.write_str(" style=\"text-align: ");
                        ctx.write_str(align);
                        ctx.write_str("\"");
                    } else {
                        ctx.write_str(" align=\"");
                        ctx.write_str(align);
                        ctx.write_str("\"");
                    }
                }
                ctx.write_sourcepos(node)?;
                ctx.write_str(">");
            }
            (ExtensionPayload::TableCell { header, .. }, false) => {
                ctx.write_str(if *header { "</th>" } else { "</td>" });
                ctx.cr();
            }
            _ => {}
        }
        Ok(())
    }
}

fn is_header_row(value: &NodeValue) -> bool {
    matches!(
        value,
        NodeValue::Extension(ExtensionNode {
            payload: ExtensionPayload::TableRow { header: true },
            ..
        })
    )
}

/// Parses `| :--- | :---: | ---: |`. The row must contain a pipe and every
/// cell must be dashes with optional colons at either end.
fn parse_delimiter_row(line: &str) -> Option<Vec<TableAlignment>> {
    let line = line.trim_end_matches(['\n', '\r']).trim_matches([' ', '\t']);
    if !line.contains('|') {
        return None;
    }
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut alignments = Vec::new();
    for cell in inner.split('|') {
        let cell = cell.trim_matches([' ', '\t']);
        let left = cell.starts_with(':');
        let right = cell.len() > 1 && cell.ends_with(':');
        let dashes = &cell[usize::from(left)..cell.len() - usize::from(right)];
        if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
            return None;
        }
        alignments.push(match (left, right) {
            (true, true) => TableAlignment::Center,
            (true, false) => TableAlignment::Left,
            (false, true) => TableAlignment::Right,
            (false, false) => TableAlignment::None,
        });
    }
    Some(alignments)
}

/// Cells of one row. Outer pipes are optional, and `\|` is a literal pipe.
fn split_row(line: &str) -> Vec<String> {
    let line = line.trim_matches([' ', '\t', '\n', '\r']);
    let bytes = line.as_bytes();
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut start = usize::from(bytes.first() == Some(&b'|'));
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'|') => {
                cell.push_str(&line[start..i]);
                cell.push('|');
                i += 2;
                start = i;
            }
            b'|' => {
                cell.push_str(&line[start..i]);
                cells.push(cell.trim_matches([' ', '\t']).to_owned());
                cell.clear();
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    let ended_with_pipe = start == bytes.len() && start > 0 && bytes[start - 1] == b'|';
    if !ended_with_pipe || !cell.is_empty() {
        cell.push_str(&line[start..]);
        cells.push(cell.trim_matches([' ', '\t']).to_owned());
    }
    cells
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Options, markdown_to_html};

    fn table(input: &str) -> String {
        markdown_to_html(input, &Options::default().with_extension("table")).unwrap()
    }

    #[test]
    fn delimiter_rows() {
        use TableAlignment::*;
        assert_eq!(
            parse_delimiter_row("| :-- | :-: | --: | - |"),
            Some(vec![Left, Center, Right, None])
        );
        assert_eq!(parse_delimiter_row("--- | ---"), Some(vec![None, None]));
        assert_eq!(parse_delimiter_row("---"), Option::None);
        assert_eq!(parse_delimiter_row("| -x- |"), Option::None);
        assert_eq!(parse_delimiter_row("| : |"), Option::None);
    }

    #[test]
    fn row_splitting() {
        assert_eq!(split_row("| a | b |"), ["a", "b"]);
        assert_eq!(split_row("a | b"), ["a", "b"]);
        assert_eq!(split_row("| a \\| b | é |"), ["a | b", "é"]);
        assert_eq!(split_row("| a | |"), ["a", ""]);
    }

    #[test]
    fn basic_table() {
        assert_eq!(
            table("| abc | def |\n| --- | --- |\n| bar | baz |"),
            "<table>\n<thead>\n<tr>\n<th>abc</th>\n<th>def</th>\n</tr>\n</thead>\n\
             <tbody>\n<tr>\n<td>bar</td>\n<td>baz</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn header_only_table_has_no_body() {
        assert_eq!(
            table("| a |\n| :-: |"),
            "<table>\n<thead>\n<tr>\n<th align=\"center\">a</th>\n</tr>\n</thead>\n</table>\n"
        );
    }

    #[test]
    fn rows_are_padded_and_truncated() {
        assert_eq!(
            table("| a | b |\n| - | - |\n| c |\n| d | e | f |"),
            "<table>\n<thead>\n<tr>\n<th>a</th>\n<th>b</th>\n</tr>\n</thead>\n<tbody>\n\
             <tr>\n<td>c</td>\n<td></td>\n</tr>\n<tr>\n<td>d</td>\n<td>e</td>\n</tr>\n\
             </tbody>\n</table>\n"
        );
    }

    #[test]
    fn mismatched_header_is_a_paragraph() {
        assert_eq!(
            table("| a | b |\n| - |\n| c |"),
            "<p>| a | b |\n| - |\n| c |</p>\n"
        );
    }

    #[test]
    fn paragraph_lines_before_header_are_kept() {
        assert_eq!(
            table("intro\n| a |\n| - |"),
            "<p>intro</p>\n<table>\n<thead>\n<tr>\n<th>a</th>\n</tr>\n</thead>\n</table>\n"
        );
    }

    #[test]
    fn blank_line_and_block_starts_end_the_table() {
        let html = table("| a |\n| - |\n| b |\n> quote");
        assert!(html.ends_with("</tbody>\n</table>\n<blockquote>\n<p>quote</p>\n</blockquote>\n"));
        let html = table("| a |\n| - |\n\nafter");
        assert!(html.ends_with("</table>\n<p>after</p>\n"));
    }

    #[test]
    fn cells_get_inline_markup() {
        let html = table("| *a* | `b \\| c` |\n| - | - |");
        assert!(html.contains("<th><em>a</em></th>"));
        assert!(html.contains("<th><code>b | c</code></th>"));
    }

    #[test]
    fn style_attributes_option() {
        let opts = Options::default()
            .with_extension("table")
            .with_flag(OptionFlags::TABLE_PREFER_STYLE_ATTRIBUTES);
        let html = markdown_to_html("| a |\n| --: |", &opts).unwrap();
        assert!(html.contains("<th style=\"text-align: right\">a</th>"));
    }
}
