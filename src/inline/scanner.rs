use super::*;
use crate::extension::{InlineCursor, InlineMatch};

static SPECIAL: [bool; 256] = {
    let mut t = [false; 256];
    t[b'\\' as usize] = true;
    t[b'`' as usize] = true;
    t[b'*' as usize] = true;
    t[b'_' as usize] = true;
    t[b'!' as usize] = true;
    t[b'[' as usize] = true;
    t[b']' as usize] = true;
    t[b'<' as usize] = true;
    t[b'&' as usize] = true;
    t[b'\n' as usize] = true;
    t
};

/// Key for the lowest position an opener search may reach.
type BottomKey = (u8, bool, usize);

impl InlineScanner<'_> {
    #[inline]
    fn is_special(&self, b: u8) -> bool {
        SPECIAL[b as usize] || self.enabled.is_trigger(b) || self.enabled.delimiter_owner(b).is_some()
    }

    pub(super) fn scan_all(&mut self) -> Result<()> {
        let mut text_start = self.pos;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if !self.is_special(b) {
                self.pos += 1;
                while self.pos < self.bytes.len() && !self.is_special(self.bytes[self.pos]) {
                    self.pos += 1;
                }
                continue;
            }

            if self.enabled.is_trigger(b) {
                if let Some(m) = self.try_extension_inline(b, text_start) {
                    let claimed = self.pos - m.rewind;
                    self.flush_text_range(text_start, claimed)?;
                    let node = self.push_node(m.value)?;
                    if let Some(text) = m.text {
                        let child = self.arena.alloc(NodeValue::Text(text), Sourcepos::default())?;
                        self.arena.get_mut(child).open = false;
                        self.arena.append(node, child);
                    }
                    self.pos += m.advance;
                    text_start = self.pos;
                    continue;
                }
            }

            if let Some(ext) = self.enabled.delimiter_owner(b) {
                let run = self.bytes[self.pos..].iter().take_while(|&&c| c == b).count();
                if self.enabled.get(ext).accepts_delimiter_run(run, self.options) {
                    self.flush_text_range(text_start, self.pos)?;
                    self.scan_delim_run(b, Some(ext))?;
                } else {
                    self.pos += run;
                    continue;
                }
                text_start = self.pos;
                continue;
            }

            match b {
                b'\\' => {
                    let next = self.peek(self.pos + 1);
                    if next == b'\n' {
                        self.flush_text_range(text_start, self.pos)?;
                        self.push_node(NodeValue::LineBreak)?;
                        self.pos += 2;
                        self.skip_line_indent();
                        text_start = self.pos;
                    } else if is_ascii_punctuation(next) {
                        self.flush_text_range(text_start, self.pos)?;
                        self.flush_text_range(self.pos + 1, self.pos + 2)?;
                        self.pos += 2;
                        text_start = self.pos;
                    } else {
                        self.pos += 1;
                    }
                }
                b'`' => {
                    self.flush_text_range(text_start, self.pos)?;
                    self.scan_code_span()?;
                    text_start = self.pos;
                }
                b'*' | b'_' => {
                    self.flush_text_range(text_start, self.pos)?;
                    self.scan_delim_run(b, None)?;
                    text_start = self.pos;
                }
                b'!' => {
                    if self.peek(self.pos + 1) == b'[' {
                        self.flush_text_range(text_start, self.pos)?;
                        self.push_bracket(true)?;
                        text_start = self.pos;
                    } else {
                        self.pos += 1;
                    }
                }
                b'[' => {
                    self.flush_text_range(text_start, self.pos)?;
                    self.push_bracket(false)?;
                    text_start = self.pos;
                }
                b']' => {
                    self.flush_text_range(text_start, self.pos)?;
                    self.pos += 1;
                    self.handle_close_bracket()?;
                    text_start = self.pos;
                }
                b'<' => {
                    self.flush_text_range(text_start, self.pos)?;
                    if !(self.try_autolink()? || self.try_html_inline()?) {
                        self.push_text("<")?;
                        self.pos += 1;
                    }
                    text_start = self.pos;
                }
                b'&' => {
                    self.flush_text_range(text_start, self.pos)?;
                    if !self.try_entity()? {
                        self.push_text("&")?;
                        self.pos += 1;
                    }
                    text_start = self.pos;
                }
                b'\n' => {
                    let mut text_end = self.pos;
                    while text_end > text_start && self.bytes[text_end - 1] == b' ' {
                        text_end -= 1;
                    }
                    let hard = self.pos - text_end >= 2;
                    self.flush_text_range(text_start, text_end)?;
                    self.push_node(if hard {
                        NodeValue::LineBreak
                    } else {
                        NodeValue::SoftBreak
                    })?;
                    self.pos += 1;
                    self.skip_line_indent();
                    text_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }
        self.flush_text_range(text_start, self.pos)
    }

    /// Offers the cursor to each extension registered for `trigger`.
    fn try_extension_inline(&mut self, trigger: u8, text_start: usize) -> Option<InlineMatch> {
        let (enabled, input, pos) = (self.enabled, self.input, self.pos);
        let mut cursor = InlineCursor {
            input,
            pos,
            text_start,
            options: self.options,
            footnotes: &mut *self.footnotes,
        };
        enabled
            .iter()
            .filter(|(_, ext)| ext.inline_triggers().contains(&trigger))
            .find_map(|(_, ext)| {
                let m = ext.parse_inline(&mut cursor)?;
                let valid = m.advance > 0
                    && m.rewind <= pos - text_start
                    && pos + m.advance <= input.len()
                    && input.is_char_boundary(pos - m.rewind)
                    && input.is_char_boundary(pos + m.advance);
                trace!(extension = ext.name(), valid, "inline match");
                valid.then_some(m)
            })
    }

    fn skip_line_indent(&mut self) {
        while matches!(self.peek(self.pos), b' ' | b'\t') {
            self.pos += 1;
        }
    }

    pub(super) fn skip_ws(&mut self) {
        while matches!(self.peek(self.pos), b' ' | b'\t' | b'\n') {
            self.pos += 1;
        }
    }

    fn scan_code_span(&mut self) -> Result<()> {
        let start = self.pos;
        let open_count = self.bytes[start..].iter().take_while(|&&b| b == b'`').count();
        self.pos += open_count;
        let after_open = self.pos;

        loop {
            let Some(idx) = memchr::memchr(b'`', &self.bytes[self.pos..]) else {
                // No closer: the backticks are literal.
                self.flush_text_range(start, after_open)?;
                self.pos = after_open;
                return Ok(());
            };
            let close_start = self.pos + idx;
            let close_count = self.bytes[close_start..]
                .iter()
                .take_while(|&&b| b == b'`')
                .count();
            self.pos = close_start + close_count;
            if close_count != open_count {
                continue;
            }

            let content = self.input[after_open..close_start].replace('\n', " ");
            let b = content.as_bytes();
            let stripped = if b.len() >= 2
                && b[0] == b' '
                && b[b.len() - 1] == b' '
                && !b.iter().all(|&c| c == b' ')
            {
                content[1..content.len() - 1].to_owned()
            } else {
                content
            };
            self.push_node(NodeValue::Code(stripped))?;
            return Ok(());
        }
    }

    fn scan_delim_run(&mut self, marker: u8, ext: Option<usize>) -> Result<()> {
        let run_start = self.pos;
        let count = self.bytes[run_start..]
            .iter()
            .take_while(|&&b| b == marker)
            .count();
        self.pos += count;

        let before = char_before(self.input, run_start);
        let after = char_at(self.input, self.pos);
        let (can_open, can_close) = flanking(marker, before, after);

        let node = self.push_node(NodeValue::Text(self.input[run_start..self.pos].to_owned()))?;
        let idx = self.delims.len();
        self.delims.push(Delimiter {
            node,
            ch: marker,
            len: count,
            orig_len: count,
            can_open,
            can_close,
            prev: self.last_delim,
            next: None,
            ext,
        });
        if let Some(prev) = self.last_delim {
            self.delims[prev].next = Some(idx);
        }
        self.last_delim = Some(idx);
        Ok(())
    }

    fn push_bracket(&mut self, image: bool) -> Result<()> {
        let len = if image { 2 } else { 1 };
        let node = self.push_node(NodeValue::Text(self.input[self.pos..self.pos + len].to_owned()))?;
        self.pos += len;
        if let Some(last) = self.brackets.last_mut() {
            last.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            image,
            active: true,
            bracket_after: false,
            delim_bottom: self.last_delim,
            text_pos: self.pos,
        });
        Ok(())
    }

    /// Called with `pos` just past a `]`.
    fn handle_close_bracket(&mut self) -> Result<()> {
        let Some(opener) = self.brackets.last() else {
            self.push_text("]")?;
            return Ok(());
        };
        if !opener.active {
            self.brackets.pop();
            self.push_text("]")?;
            return Ok(());
        }
        let (image, opener_node, delim_bottom) = (opener.image, opener.node, opener.delim_bottom);
        let close_pos = self.pos - 1;
        let after_text = self.pos;

        let target = match self.try_inline_link() {
            Some(link) => Some(link),
            None => {
                self.pos = after_text;
                self.try_reference_link(close_pos)
            }
        };
        let Some(link) = target else {
            self.brackets.pop();
            self.pos = after_text;
            self.push_text("]")?;
            return Ok(());
        };

        let value = if image {
            NodeValue::Image(link)
        } else {
            NodeValue::Link(link)
        };
        self.wrap_link(opener_node, value)?;
        self.process_emphasis(delim_bottom)?;
        self.brackets.pop();

        if !image {
            for bracket in self.brackets.iter_mut().filter(|b| !b.image) {
                bracket.active = false;
            }
        }
        Ok(())
    }

    /// Replaces the opener text with a link node holding every node after it.
    fn wrap_link(&mut self, opener_node: NodeId, value: NodeValue) -> Result<NodeId> {
        let link = self.arena.alloc(value, Sourcepos::default())?;
        self.arena.get_mut(link).open = false;
        let mut next = self.arena.next_sibling(opener_node);
        while let Some(child) = next {
            next = self.arena.next_sibling(child);
            self.arena.detach(child);
            self.arena.append(link, child);
        }
        self.arena.insert_after(opener_node, link);
        self.arena.detach(opener_node);
        Ok(link)
    }

    fn remove_delimiter(&mut self, idx: usize) {
        let (prev, next) = (self.delims[idx].prev, self.delims[idx].next);
        if let Some(p) = prev {
            self.delims[p].next = next;
        }
        match next {
            Some(n) => self.delims[n].prev = prev,
            None => self.last_delim = prev,
        }
    }

    /// Resolves emphasis (and extension delimiters) above `stack_bottom`,
    /// then drops every delimiter above it.
    pub(super) fn process_emphasis(&mut self, stack_bottom: Option<usize>) -> Result<()> {
        let mut openers_bottom: HashMap<BottomKey, Option<usize>> = HashMap::new();

        let mut closer = self.last_delim;
        while let Some(c) = closer {
            if self.delims[c].prev == stack_bottom {
                break;
            }
            closer = self.delims[c].prev;
        }

        while let Some(c) = closer {
            if !self.delims[c].can_close {
                closer = self.delims[c].next;
                continue;
            }
            let ch = self.delims[c].ch;
            let key = (ch, self.delims[c].can_open, self.delims[c].orig_len % 3);
            let bottom = openers_bottom.get(&key).copied().unwrap_or(stack_bottom);

            let mut opener = self.delims[c].prev;
            let mut found = None;
            while let Some(o) = opener {
                if Some(o) == stack_bottom || Some(o) == bottom {
                    break;
                }
                let od = &self.delims[o];
                let cd = &self.delims[c];
                if od.can_open && od.ch == ch && od.len > 0 {
                    let odd_match = (cd.can_open || od.can_close)
                        && (od.orig_len + cd.orig_len) % 3 == 0
                        && !(od.orig_len % 3 == 0 && cd.orig_len % 3 == 0);
                    if !odd_match {
                        found = Some(o);
                        break;
                    }
                }
                opener = od.prev;
            }

            match found {
                Some(o) => {
                    closer = match self.delims[c].ext {
                        Some(ext) => self.insert_extension_span(ext, o, c)?,
                        None => {
                            let used = if self.delims[o].len >= 2 && self.delims[c].len >= 2 {
                                2
                            } else {
                                1
                            };
                            let value = if used == 2 {
                                NodeValue::Strong
                            } else {
                                NodeValue::Emph
                            };
                            self.insert_span(o, c, used, value)?
                        }
                    };
                }
                None => {
                    let prev = self.delims[c].prev;
                    let next = self.delims[c].next;
                    openers_bottom.insert(key, prev);
                    if !self.delims[c].can_open {
                        self.remove_delimiter(c);
                    }
                    closer = next;
                }
            }
        }

        while let Some(last) = self.last_delim {
            if Some(last) == stack_bottom {
                break;
            }
            self.remove_delimiter(last);
        }
        Ok(())
    }

    fn insert_extension_span(
        &mut self,
        ext: usize,
        opener: usize,
        closer: usize,
    ) -> Result<Option<usize>> {
        let (olen, clen) = (self.delims[opener].len, self.delims[closer].len);
        match self.enabled.get(ext).match_delimiters(olen, clen) {
            Some((used, node)) if used > 0 && used <= olen.min(clen) => {
                self.insert_span(opener, closer, used, NodeValue::Extension(node))
            }
            _ => {
                // Unpaired: both runs stay literal text.
                let next = self.delims[closer].next;
                let mut d = Some(closer);
                while let Some(i) = d {
                    d = self.delims[i].prev;
                    self.remove_delimiter(i);
                    if i == opener {
                        break;
                    }
                }
                Ok(next)
            }
        }
    }

    /// Moves the nodes between two delimiter runs into a new `value` node,
    /// spending `used` bytes of each run. Returns the next closer to try.
    fn insert_span(
        &mut self,
        opener: usize,
        closer: usize,
        used: usize,
        value: NodeValue,
    ) -> Result<Option<usize>> {
        self.delims[opener].len -= used;
        self.delims[closer].len -= used;
        let opener_node = self.delims[opener].node;
        let closer_node = self.delims[closer].node;
        for (node, len) in [
            (opener_node, self.delims[opener].len),
            (closer_node, self.delims[closer].len),
        ] {
            if let NodeValue::Text(text) = &mut self.arena.get_mut(node).value {
                text.truncate(len);
            }
        }

        let mut between = self.delims[closer].prev;
        while let Some(d) = between {
            if d == opener {
                break;
            }
            between = self.delims[d].prev;
            self.remove_delimiter(d);
        }

        let span = self.arena.alloc(value, Sourcepos::default())?;
        self.arena.get_mut(span).open = false;
        let mut next = self.arena.next_sibling(opener_node);
        while let Some(child) = next {
            if child == closer_node {
                break;
            }
            next = self.arena.next_sibling(child);
            self.arena.detach(child);
            self.arena.append(span, child);
        }
        self.arena.insert_after(opener_node, span);

        if self.delims[opener].len == 0 {
            self.arena.detach(opener_node);
            self.remove_delimiter(opener);
        }
        if self.delims[closer].len == 0 {
            self.arena.detach(closer_node);
            let next = self.delims[closer].next;
            self.remove_delimiter(closer);
            Ok(next)
        } else {
            Ok(Some(closer))
        }
    }
}
