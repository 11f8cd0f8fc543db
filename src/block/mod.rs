mod html_block;
mod leaf_blocks;
pub(crate) mod link_ref_def;
mod parser;

use std::borrow::Cow;

use tracing::trace;

use crate::arena::{Arena, NodeId};
use crate::error::Result;
use crate::extension::{Enabled, TreeMut};
use crate::inline::{LinkRefMap, LinkReference, normalize_reference_label};
use crate::nodes::{LineColumn, NodeValue, Sourcepos};
use crate::options::Options;
use crate::tree::FootnoteMap;
use html_block::HtmlBlockEnd;
use link_ref_def::parse_link_ref_def;

const TAB_STOP: usize = 4;
const CODE_INDENT: usize = 4;

#[inline(always)]
fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// One input line and the scanner's position in it. A tab may be partly
/// consumed, in which case `offset` still points at it and `column` is past
/// the consumed columns.
#[derive(Clone, Copy, Debug)]
struct Line<'a> {
    raw: &'a str,
    offset: usize,
    column: usize,
    partial_tab: bool,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
}

impl<'a> Line<'a> {
    fn new(raw: &'a str) -> Self {
        let mut line = Self {
            raw,
            offset: 0,
            column: 0,
            partial_tab: false,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
        };
        line.find_first_nonspace();
        line
    }

    #[inline]
    fn peek(&self, at: usize) -> u8 {
        self.raw.as_bytes().get(at).copied().unwrap_or(0)
    }

    /// Locates the next non-space byte. The previous result is reused while
    /// the offset has not reached it, so consuming deep indentation one
    /// container at a time stays linear in the line length.
    fn find_first_nonspace(&mut self) {
        let bytes = self.raw.as_bytes();
        if self.first_nonspace <= self.offset {
            let mut pos = self.offset;
            let mut col = self.column;
            let mut chars_to_tab = TAB_STOP - (col % TAB_STOP);
            while pos < bytes.len() {
                match bytes[pos] {
                    b' ' => {
                        pos += 1;
                        col += 1;
                        chars_to_tab -= 1;
                        if chars_to_tab == 0 {
                            chars_to_tab = TAB_STOP;
                        }
                    }
                    b'\t' => {
                        pos += 1;
                        col += chars_to_tab;
                        chars_to_tab = TAB_STOP;
                    }
                    _ => break,
                }
            }
            self.first_nonspace = pos;
            self.first_nonspace_column = col;
        }
        self.indent = self.first_nonspace_column - self.column;
        self.blank = self.first_nonspace >= bytes.len();
    }

    /// Advances by `count` columns (tabs may be split) or `count` bytes.
    fn advance(&mut self, mut count: usize, columns: bool) {
        let bytes = self.raw.as_bytes();
        while count > 0 && self.offset < bytes.len() {
            if bytes[self.offset] == b'\t' {
                let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                if columns {
                    self.partial_tab = chars_to_tab > count;
                    let step = count.min(chars_to_tab);
                    self.column += step;
                    if !self.partial_tab {
                        self.offset += 1;
                    }
                    count -= step;
                } else {
                    self.partial_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partial_tab = false;
                self.offset += 1;
                self.column += 1;
                count -= 1;
            }
        }
        self.find_first_nonspace();
    }

    fn advance_to_nonspace(&mut self) {
        let n = self.first_nonspace - self.offset;
        self.advance(n, false);
    }

    fn advance_to_end(&mut self) {
        let n = self.raw.len() - self.offset;
        self.advance(n, false);
    }

    #[inline]
    fn nonspace_byte(&self) -> u8 {
        self.peek(self.first_nonspace)
    }

    fn nonspace_rest(&self) -> &'a str {
        &self.raw[self.first_nonspace..]
    }

    fn rest(&self) -> &'a str {
        &self.raw[self.offset..]
    }

    /// Remainder of the line as content, the unconsumed part of a split
    /// tab expanded to spaces.
    fn content(&self) -> Cow<'a, str> {
        if self.partial_tab {
            static SPACES: &str = "    ";
            let cols = TAB_STOP - (self.column % TAB_STOP);
            let rest = &self.raw[self.offset + 1..];
            let mut s = String::with_capacity(cols + rest.len());
            s.push_str(&SPACES[..cols]);
            s.push_str(rest);
            Cow::Owned(s)
        } else {
            Cow::Borrowed(self.rest())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpenKind {
    Document,
    BlockQuote,
    List,
    Item {
        marker_offset: usize,
        padding: usize,
    },
    FencedCode {
        fence_char: u8,
        fence_len: usize,
        fence_offset: usize,
    },
    IndentedCode,
    HtmlBlock {
        end: HtmlBlockEnd,
    },
    Paragraph,
    Heading,
    ThematicBreak,
    Extension {
        ext: usize,
        leaf: bool,
    },
}

impl OpenKind {
    fn accepts_lines(self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Heading
                | Self::FencedCode { .. }
                | Self::IndentedCode
                | Self::Extension { leaf: true, .. }
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenBlock {
    node: NodeId,
    kind: OpenKind,
}

/// Everything the block phase hands to the inline phase.
pub(crate) struct BlockTree {
    pub arena: Arena,
    pub root: NodeId,
    pub refs: LinkRefMap,
    pub footnotes: FootnoteMap,
}

pub(crate) struct BlockParser<'p> {
    arena: Arena,
    root: NodeId,
    open: Vec<OpenBlock>,
    refs: LinkRefMap,
    footnotes: FootnoteMap,
    options: &'p Options,
    enabled: &'p Enabled,
    line_number: usize,
    line_len: usize,
    prev_line_len: usize,
}

impl<'p> BlockParser<'p> {
    pub fn new(options: &'p Options, enabled: &'p Enabled) -> Result<Self> {
        let mut arena = Arena::new(options.max_nodes);
        let root = arena.alloc(NodeValue::Document, Sourcepos::starting_at(1, 1))?;
        let mut open = Vec::with_capacity(16);
        open.push(OpenBlock {
            node: root,
            kind: OpenKind::Document,
        });
        Ok(Self {
            arena,
            root,
            open,
            refs: LinkRefMap::default(),
            footnotes: FootnoteMap::default(),
            options,
            enabled,
            line_number: 0,
            line_len: 0,
            prev_line_len: 0,
        })
    }

    /// Consumes the whole input. Lines end at `\n`, `\r\n` or `\r`.
    pub fn parse(mut self, input: &str) -> Result<BlockTree> {
        let bytes = input.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            let (end, next) = match memchr::memchr2(b'\n', b'\r', &bytes[start..]) {
                Some(off) => {
                    let end = start + off;
                    if bytes[end] == b'\r' && bytes.get(end + 1) == Some(&b'\n') {
                        (end, end + 2)
                    } else {
                        (end, end + 1)
                    }
                }
                None => (bytes.len(), bytes.len()),
            };
            self.process_line(&input[start..end])?;
            start = next;
        }
        self.finish()
    }

    fn finish(mut self) -> Result<BlockTree> {
        let end = LineColumn {
            line: self.line_number.max(1),
            column: self.line_len,
        };
        while !self.open.is_empty() {
            self.close_top(end)?;
        }
        Ok(BlockTree {
            arena: self.arena,
            root: self.root,
            refs: self.refs,
            footnotes: self.footnotes,
        })
    }

    /// Where a block ends when the current line fails to continue it.
    fn end_of_previous_line(&self) -> LineColumn {
        LineColumn {
            line: self.line_number.saturating_sub(1).max(1),
            column: self.prev_line_len,
        }
    }

    fn end_of_current_line(&self) -> LineColumn {
        LineColumn {
            line: self.line_number,
            column: self.line_len,
        }
    }

    /// Closes every open block above stack index `keep`.
    fn close_blocks_above(&mut self, keep: usize) -> Result<()> {
        let end = self.end_of_previous_line();
        while self.open.len() > keep + 1 {
            self.close_top(end)?;
        }
        Ok(())
    }

    fn close_top(&mut self, end: LineColumn) -> Result<()> {
        let Some(block) = self.open.pop() else {
            return Ok(());
        };
        {
            let ast = self.arena.get_mut(block.node);
            ast.open = false;
            ast.sourcepos.end = end;
        }
        trace!(kind = ?block.kind, line = end.line, "close block");
        self.finalize(block)
    }

    fn finalize(&mut self, block: OpenBlock) -> Result<()> {
        let node = block.node;
        match block.kind {
            OpenKind::Paragraph => {
                if !self.resolve_reference_definitions(node) {
                    self.arena.detach(node);
                }
            }
            OpenKind::FencedCode { .. } => {
                let content = std::mem::take(&mut self.arena.get_mut(node).content);
                if let NodeValue::CodeBlock(code) = &mut self.arena.get_mut(node).value {
                    code.literal = content;
                }
            }
            OpenKind::IndentedCode => {
                let mut content = std::mem::take(&mut self.arena.get_mut(node).content);
                strip_trailing_blank_lines(&mut content);
                content.push('\n');
                if let NodeValue::CodeBlock(code) = &mut self.arena.get_mut(node).value {
                    code.literal = content;
                }
            }
            OpenKind::HtmlBlock { .. } => {
                let content = std::mem::take(&mut self.arena.get_mut(node).content);
                if let NodeValue::HtmlBlock(html) = &mut self.arena.get_mut(node).value {
                    html.literal = content;
                }
            }
            OpenKind::List => {
                let tight = self.list_is_tight(node);
                if let NodeValue::List(list) = &mut self.arena.get_mut(node).value {
                    list.tight = tight;
                }
            }
            OpenKind::Extension { ext, .. } => {
                let enabled = self.enabled;
                let mut tree = TreeMut {
                    arena: &mut self.arena,
                    root: self.root,
                    footnotes: &mut self.footnotes,
                    options: self.options,
                };
                enabled.get(ext).finalize_block(&mut tree, node)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Strips leading link reference definitions from a paragraph. Returns
    /// whether any content is left.
    fn resolve_reference_definitions(&mut self, node: NodeId) -> bool {
        let mut content = std::mem::take(&mut self.arena.get_mut(node).content);
        let mut pos = 0;
        while content[pos..].starts_with('[') {
            let Some((def, consumed)) = parse_link_ref_def(&content[pos..]) else {
                break;
            };
            let key = normalize_reference_label(&def.label).into_owned();
            self.refs.entry(key).or_insert(LinkReference {
                href: def.url,
                title: def.title,
            });
            pos += consumed;
        }
        if pos > 0 {
            let rest = content[pos..].trim_start_matches([' ', '\t']);
            let skip = content.len() - rest.len();
            content.drain(..skip);
        }
        let has_content = content.bytes().any(|b| !b.is_ascii_whitespace());
        self.arena.get_mut(node).content = content;
        has_content
    }

    /// A list is loose when an item is followed by a blank line before the
    /// next item, or when blank lines separate blocks inside an item.
    fn list_is_tight(&self, list: NodeId) -> bool {
        let mut item = self.arena.first_child(list);
        while let Some(it) = item {
            let next_item = self.arena.next_sibling(it);
            if self.arena.get(it).last_line_blank && next_item.is_some() {
                return false;
            }
            let mut sub = self.arena.first_child(it);
            while let Some(s) = sub {
                let next_sub = self.arena.next_sibling(s);
                if self.ends_with_blank_line(s) && (next_item.is_some() || next_sub.is_some()) {
                    return false;
                }
                sub = next_sub;
            }
            item = next_item;
        }
        true
    }

    fn ends_with_blank_line(&self, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            let ast = self.arena.get(id);
            if ast.last_line_blank {
                return true;
            }
            cur = match ast.value {
                NodeValue::List(_) | NodeValue::Item(_) => self.arena.last_child(id),
                _ => None,
            };
        }
        false
    }
}

fn strip_trailing_blank_lines(content: &mut String) {
    let bytes = content.as_bytes();
    let mut end = bytes.len();
    let mut cut = bytes.len();
    while end > 0 {
        let line_start = bytes[..end - 1]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |p| p + 1);
        let line = &bytes[line_start..end];
        if line.iter().all(|&b| b == b' ' || b == b'\t' || b == b'\n') {
            cut = line_start;
            end = line_start;
        } else {
            break;
        }
    }
    content.truncate(cut);
    if content.ends_with('\n') {
        content.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_split_into_columns() {
        let mut line = Line::new("\tfoo");
        assert_eq!(line.indent, 4);
        line.advance(2, true);
        assert!(line.partial_tab);
        assert_eq!(line.content(), "  foo");
        assert_eq!(line.indent, 2);
    }

    #[test]
    fn blank_lines() {
        assert!(Line::new("   \t").blank);
        assert!(!Line::new("  x").blank);
        assert!(Line::new("").blank);
    }

    #[test]
    fn trailing_blank_lines_are_dropped() {
        let mut s = String::from("a\n  b\n\n   \n");
        strip_trailing_blank_lines(&mut s);
        assert_eq!(s, "a\n  b");
        let mut s = String::from("\n\n");
        strip_trailing_blank_lines(&mut s);
        assert_eq!(s, "");
    }
}
