use super::*;
use crate::extension::{BlockContinue, BlockOpen, BlockStart, LineView};
use crate::nodes::{NodeCodeBlock, NodeHeading, NodeHtmlBlock, NodeList};
use html_block::{html_block_ends, parse_html_block_start};
use leaf_blocks::{
    can_interrupt_paragraph, is_thematic_break, parse_list_marker, scan_atx_heading_start,
    scan_closing_fence, scan_fence_start, scan_setext_underline, strip_closing_hashes,
};
use link_ref_def::unescape_and_resolve;

/// Outcome of opening new blocks on a line.
#[derive(Clone, Copy, Debug)]
struct LineState {
    /// Stack index of the block the rest of the line goes to.
    container: usize,
    /// Deepest stack index whose continuation matched.
    matched: usize,
    opened: bool,
    /// The line was used up by a block start (fence, underline, rule).
    consumed: bool,
}

impl<'p> BlockParser<'p> {
    pub(super) fn process_line(&mut self, raw: &str) -> Result<()> {
        self.prev_line_len = self.line_len;
        self.line_number += 1;
        self.line_len = raw.len();

        let mut line = Line::new(raw);
        let Some((matched, all_matched)) = self.check_open_blocks(&mut line)? else {
            return Ok(());
        };
        let state = self.open_new_blocks(&mut line, matched, all_matched)?;
        self.add_text_to_container(&mut line, state)
    }

    /// Walks the open blocks and consumes each one's continuation marker.
    /// Returns the deepest matched index, or `None` when the line closed a
    /// fenced code block and needs no further work.
    fn check_open_blocks(&mut self, line: &mut Line<'_>) -> Result<Option<(usize, bool)>> {
        for i in 1..self.open.len() {
            let block = self.open[i];
            let ok = match block.kind {
                OpenKind::Document | OpenKind::List | OpenKind::ThematicBreak => true,
                OpenKind::BlockQuote => {
                    if line.indent <= 3 && line.nonspace_byte() == b'>' {
                        line.advance(line.indent + 1, true);
                        if is_space_or_tab(line.peek(line.offset)) {
                            line.advance(1, true);
                        }
                        true
                    } else {
                        false
                    }
                }
                OpenKind::Item {
                    marker_offset,
                    padding,
                } => {
                    if line.indent >= marker_offset + padding {
                        line.advance(marker_offset + padding, true);
                        true
                    } else if line.blank && self.arena.first_child(block.node).is_some() {
                        line.advance_to_nonspace();
                        true
                    } else {
                        false
                    }
                }
                OpenKind::FencedCode {
                    fence_char,
                    fence_len,
                    fence_offset,
                } => {
                    let closes = line.indent <= 3
                        && line.nonspace_byte() == fence_char
                        && scan_closing_fence(line.nonspace_rest(), fence_char)
                            .is_some_and(|len| len >= fence_len);
                    if closes {
                        let end = self.end_of_current_line();
                        self.close_blocks_above(i)?;
                        self.close_top(end)?;
                        return Ok(None);
                    }
                    let mut skip = fence_offset;
                    while skip > 0 && is_space_or_tab(line.peek(line.offset)) {
                        line.advance(1, true);
                        skip -= 1;
                    }
                    true
                }
                OpenKind::IndentedCode => {
                    if line.indent >= CODE_INDENT {
                        line.advance(CODE_INDENT, true);
                        true
                    } else if line.blank {
                        line.advance_to_nonspace();
                        true
                    } else {
                        false
                    }
                }
                OpenKind::HtmlBlock { end } => !(line.blank && end.ends_at_blank()),
                OpenKind::Paragraph => !line.blank,
                OpenKind::Heading => false,
                OpenKind::Extension { ext, .. } => match self.continue_extension(ext, block.node, line)
                {
                    BlockContinue::Matched { advance_columns } => {
                        line.advance(advance_columns, true);
                        true
                    }
                    BlockContinue::NotMatched => false,
                },
            };
            if !ok {
                return Ok(Some((i - 1, false)));
            }
        }
        Ok(Some((self.open.len() - 1, true)))
    }

    fn continue_extension(&self, ext: usize, node: NodeId, line: &Line<'_>) -> BlockContinue {
        let NodeValue::Extension(value) = self.arena.value(node) else {
            return BlockContinue::NotMatched;
        };
        let view = LineView {
            line: line.nonspace_rest(),
            indent: line.indent,
            blank: line.blank,
        };
        self.enabled.get(ext).continue_block(value, &view)
    }

    fn open_new_blocks(
        &mut self,
        line: &mut Line<'_>,
        matched: usize,
        all_matched: bool,
    ) -> Result<LineState> {
        let mut state = LineState {
            container: matched,
            matched,
            opened: false,
            consumed: false,
        };
        let mut maybe_lazy = self
            .open
            .last()
            .is_some_and(|b| b.kind == OpenKind::Paragraph);

        loop {
            let kind = self.open[state.container].kind;
            if matches!(
                kind,
                OpenKind::FencedCode { .. } | OpenKind::IndentedCode | OpenKind::HtmlBlock { .. }
            ) {
                break;
            }

            let indented = line.indent >= CODE_INDENT;
            let rest = line.nonspace_rest();
            let first = line.nonspace_byte();
            let start = LineColumn {
                line: self.line_number,
                column: line.first_nonspace + 1,
            };

            if !indented && first == b'>' {
                line.advance_to_nonspace();
                line.advance(1, false);
                if is_space_or_tab(line.peek(line.offset)) {
                    line.advance(1, true);
                }
                state.container =
                    self.add_child(state.container, NodeValue::BlockQuote, OpenKind::BlockQuote, start)?;
            } else if let Some((level, len)) =
                (!indented && first == b'#').then(|| scan_atx_heading_start(rest)).flatten()
            {
                line.advance(line.first_nonspace + len - line.offset, false);
                state.container = self.add_child(
                    state.container,
                    NodeValue::Heading(NodeHeading {
                        level,
                        setext: false,
                    }),
                    OpenKind::Heading,
                    start,
                )?;
            } else if let Some(fence) = (!indented).then(|| scan_fence_start(rest)).flatten() {
                let code = NodeCodeBlock {
                    fenced: true,
                    fence_char: fence.fence_char,
                    fence_length: fence.fence_len,
                    fence_offset: line.indent,
                    info: unescape_and_resolve(fence.info),
                    literal: String::new(),
                };
                let kind = OpenKind::FencedCode {
                    fence_char: fence.fence_char,
                    fence_len: fence.fence_len,
                    fence_offset: line.indent,
                };
                state.container =
                    self.add_child(state.container, NodeValue::CodeBlock(code), kind, start)?;
                line.advance_to_end();
                state.consumed = true;
            } else if let Some(end) = (!indented && first == b'<')
                .then(|| parse_html_block_start(rest, kind == OpenKind::Paragraph))
                .flatten()
            {
                let html = NodeHtmlBlock {
                    block_type: end.block_type(),
                    literal: String::new(),
                };
                state.container = self.add_child(
                    state.container,
                    NodeValue::HtmlBlock(html),
                    OpenKind::HtmlBlock { end },
                    start,
                )?;
            } else if let Some(level) = (!indented && kind == OpenKind::Paragraph)
                .then(|| scan_setext_underline(rest))
                .flatten()
            {
                let node = self.open[state.container].node;
                if self.resolve_reference_definitions(node) {
                    self.arena.get_mut(node).value =
                        NodeValue::Heading(NodeHeading { level, setext: true });
                    self.open[state.container].kind = OpenKind::Heading;
                    line.advance_to_end();
                    state.consumed = true;
                }
            } else if !indented
                && !(kind == OpenKind::Paragraph && !all_matched)
                && is_thematic_break(rest)
            {
                state.container = self.add_child(
                    state.container,
                    NodeValue::ThematicBreak,
                    OpenKind::ThematicBreak,
                    start,
                )?;
                line.advance_to_end();
                state.consumed = true;
            } else if let Some(marker) = (!indented)
                .then(|| parse_list_marker(rest))
                .flatten()
                .filter(|m| kind != OpenKind::Paragraph || can_interrupt_paragraph(m))
            {
                state.container = self.open_list_item(state.container, line, &marker, start)?;
            } else if indented && !maybe_lazy && !line.blank {
                line.advance(CODE_INDENT, true);
                let code = NodeCodeBlock {
                    fenced: false,
                    fence_char: 0,
                    fence_length: 0,
                    fence_offset: 0,
                    info: String::new(),
                    literal: String::new(),
                };
                let start = LineColumn {
                    line: self.line_number,
                    column: line.offset + 1,
                };
                state.container = self.add_child(
                    state.container,
                    NodeValue::CodeBlock(code),
                    OpenKind::IndentedCode,
                    start,
                )?;
            } else if line.blank {
                break;
            } else {
                match self.open_extension_block(state.container, line, all_matched, start)? {
                    Some((container, consumed)) => {
                        state.container = container;
                        state.consumed |= consumed;
                    }
                    None => break,
                }
            }

            state.opened = true;
            if self.open[state.container].kind.accepts_lines() {
                break;
            }
            maybe_lazy = false;
        }

        Ok(state)
    }

    fn open_list_item(
        &mut self,
        container: usize,
        line: &mut Line<'_>,
        marker: &leaf_blocks::ListMarkerInfo,
        start: LineColumn,
    ) -> Result<usize> {
        let marker_indent = line.indent;
        line.advance(line.first_nonspace + marker.marker_len - line.offset, false);

        let saved = *line;
        while line.column - saved.column <= 5 && is_space_or_tab(line.peek(line.offset)) {
            line.advance(1, true);
        }
        let spaces = line.column - saved.column;
        let padding = if spaces >= 5 || spaces < 1 || line.offset >= line.raw.len() {
            *line = saved;
            if spaces > 0 {
                line.advance(1, true);
            }
            marker.marker_len + 1
        } else {
            marker.marker_len + spaces
        };

        let data = NodeList {
            list_type: marker.list_type,
            marker_offset: marker_indent,
            padding,
            start: marker.start_num,
            delimiter: marker.delimiter,
            bullet_char: marker.bullet_char,
            tight: false,
        };

        let mut container = container;
        let continues_list = self.open[container].kind == OpenKind::List
            && match self.arena.value(self.open[container].node) {
                NodeValue::List(list) => {
                    list.list_type == data.list_type
                        && list.delimiter == data.delimiter
                        && list.bullet_char == data.bullet_char
                }
                _ => false,
            };
        if !continues_list {
            container = self.add_child(container, NodeValue::List(data), OpenKind::List, start)?;
        }
        self.add_child(
            container,
            NodeValue::Item(data),
            OpenKind::Item {
                marker_offset: marker_indent,
                padding,
            },
            start,
        )
    }

    /// Offers the line to the enabled extensions in dispatch order. Returns
    /// the new container index and whether the line was consumed.
    fn open_extension_block(
        &mut self,
        container: usize,
        line: &mut Line<'_>,
        all_matched: bool,
        start: LineColumn,
    ) -> Result<Option<(usize, bool)>> {
        let enabled = self.enabled;
        let block = self.open[container];
        let found = {
            let ast = self.arena.get(block.node);
            let request = BlockStart {
                line: line.nonspace_rest(),
                indent: line.indent,
                container: &ast.value,
                paragraph: (block.kind == OpenKind::Paragraph).then_some(ast.content.as_str()),
                all_matched,
                options: self.options,
            };
            enabled
                .iter()
                .find_map(|(idx, ext)| ext.open_block(&request).map(|open| (idx, open)))
        };
        let Some((ext, open)) = found else {
            return Ok(None);
        };

        match open {
            BlockOpen::Container { node, advance } => {
                line.advance_to_nonspace();
                line.advance(advance, false);
                let kind = OpenKind::Extension { ext, leaf: false };
                let idx = self.add_child(container, NodeValue::Extension(node), kind, start)?;
                Ok(Some((idx, false)))
            }
            BlockOpen::Leaf { node, advance } => {
                line.advance_to_nonspace();
                line.advance(advance, false);
                let kind = OpenKind::Extension { ext, leaf: true };
                let idx = self.add_child(container, NodeValue::Extension(node), kind, start)?;
                Ok(Some((idx, false)))
            }
            BlockOpen::ReplaceParagraph {
                retain,
                node,
                content,
            } => {
                if block.kind != OpenKind::Paragraph {
                    return Ok(None);
                }
                let mut start = self.arena.get(block.node).sourcepos.start;
                self.close_blocks_above(container)?;
                if retain > 0 {
                    self.arena.get_mut(block.node).content.truncate(retain);
                    let end = LineColumn {
                        line: self.line_number.saturating_sub(2).max(1),
                        column: self.prev_line_len,
                    };
                    self.close_top(end)?;
                    start = LineColumn {
                        line: self.line_number.saturating_sub(1).max(1),
                        column: 1,
                    };
                } else {
                    self.arena.detach(block.node);
                    self.open.pop();
                }
                let kind = OpenKind::Extension { ext, leaf: true };
                let parent = self.open.len() - 1;
                let idx = self.add_child(parent, NodeValue::Extension(node), kind, start)?;
                self.arena.get_mut(self.open[idx].node).content = content;
                line.advance_to_end();
                Ok(Some((idx, true)))
            }
        }
    }

    fn add_text_to_container(&mut self, line: &mut Line<'_>, state: LineState) -> Result<()> {
        let blank = line.blank && !state.consumed;
        let block = self.open[state.container];

        if blank {
            if let Some(last) = self.arena.last_child(block.node) {
                self.arena.get_mut(last).last_line_blank = true;
            }
        }
        let started_empty_item = matches!(block.kind, OpenKind::Item { .. })
            && self.arena.first_child(block.node).is_none()
            && self.arena.get(block.node).sourcepos.start.line == self.line_number;
        let last_line_blank = blank
            && !started_empty_item
            && !matches!(
                block.kind,
                OpenKind::BlockQuote
                    | OpenKind::Heading
                    | OpenKind::ThematicBreak
                    | OpenKind::FencedCode { .. }
            );
        self.arena.get_mut(block.node).last_line_blank = last_line_blank;
        let mut ancestor = self.arena.parent(block.node);
        while let Some(id) = ancestor {
            self.arena.get_mut(id).last_line_blank = false;
            ancestor = self.arena.parent(id);
        }

        let tip = self.open.len() - 1;
        if !state.opened
            && tip != state.matched
            && !line.blank
            && self.open[tip].kind == OpenKind::Paragraph
        {
            trace!(line = self.line_number, "lazy continuation");
            let node = self.open[tip].node;
            self.add_line(node, line);
            return Ok(());
        }

        self.close_blocks_above(state.container)?;
        if state.consumed {
            return Ok(());
        }

        match block.kind {
            OpenKind::FencedCode { .. } | OpenKind::IndentedCode => self.add_line(block.node, line),
            OpenKind::HtmlBlock { end } => {
                self.add_line(block.node, line);
                if html_block_ends(end, line.rest()) {
                    let end = self.end_of_current_line();
                    self.close_top(end)?;
                }
            }
            _ if line.blank => {}
            OpenKind::Heading => {
                let text = strip_closing_hashes(line.nonspace_rest());
                let content = &mut self.arena.get_mut(block.node).content;
                content.push_str(text);
                content.push('\n');
            }
            OpenKind::Paragraph | OpenKind::Extension { leaf: true, .. } => {
                line.advance_to_nonspace();
                self.add_line(block.node, line);
            }
            _ => {
                line.advance_to_nonspace();
                let start = LineColumn {
                    line: self.line_number,
                    column: line.first_nonspace + 1,
                };
                let idx =
                    self.add_child(state.container, NodeValue::Paragraph, OpenKind::Paragraph, start)?;
                let node = self.open[idx].node;
                self.add_line(node, line);
            }
        }
        Ok(())
    }

    fn add_line(&mut self, node: NodeId, line: &Line<'_>) {
        let text = line.content();
        let content = &mut self.arena.get_mut(node).content;
        content.push_str(&text);
        content.push('\n');
    }

    /// Adds a block under the open block at `parent`, first closing whatever
    /// sits above it and whatever cannot hold the new block.
    fn add_child(
        &mut self,
        parent: usize,
        value: NodeValue,
        kind: OpenKind,
        start: LineColumn,
    ) -> Result<usize> {
        self.close_blocks_above(parent)?;
        while !self.top_can_contain(&value) {
            let end = self.end_of_previous_line();
            self.close_top(end)?;
        }
        let Some(top) = self.open.last().map(|b| b.node) else {
            return Ok(0);
        };
        let id = self.arena.alloc(value, Sourcepos { start, end: start })?;
        self.arena.append(top, id);
        self.open.push(OpenBlock { node: id, kind });
        trace!(?kind, line = start.line, "open block");
        Ok(self.open.len() - 1)
    }

    fn top_can_contain(&self, child: &NodeValue) -> bool {
        let Some(top) = self.open.last() else {
            return true;
        };
        match top.kind {
            OpenKind::Document | OpenKind::BlockQuote | OpenKind::Item { .. } => {
                !matches!(child, NodeValue::Item(_))
            }
            OpenKind::List => matches!(child, NodeValue::Item(_)),
            OpenKind::Extension { ext, leaf: false } => match self.arena.value(top.node) {
                NodeValue::Extension(node) => self.enabled.get(ext).can_contain(node, child),
                _ => false,
            },
            _ => false,
        }
    }
}
