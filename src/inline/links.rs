use super::*;
use crate::block::link_ref_def::{parse_link_destination, parse_link_title, scan_link_label};
use crate::entities;
use crate::nodes::NodeLink;
use crate::options::OptionFlags;

impl InlineScanner<'_> {
    /// `(destination "title")` right after a `]`. Leaves `pos` past the `)`
    /// on success.
    pub(super) fn try_inline_link(&mut self) -> Option<NodeLink> {
        if self.peek(self.pos) != b'(' {
            return None;
        }
        self.pos += 1;
        self.skip_ws();

        if self.peek(self.pos) == b')' {
            self.pos += 1;
            return Some(NodeLink {
                url: String::new(),
                title: String::new(),
            });
        }

        let (url, dest_end) = parse_link_destination(self.input, self.pos)?;
        self.pos = dest_end;
        let before_ws = self.pos;
        self.skip_ws();

        let mut title = String::new();
        if self.pos > before_ws && matches!(self.peek(self.pos), b'"' | b'\'' | b'(') {
            let (t, end) = parse_link_title(self.input, self.pos)?;
            title = t;
            self.pos = end;
            self.skip_ws();
        }

        if self.peek(self.pos) != b')' {
            return None;
        }
        self.pos += 1;
        Some(NodeLink { url, title })
    }

    /// Full, collapsed or shortcut reference after the `]` at `close_pos`.
    pub(super) fn try_reference_link(&mut self, close_pos: usize) -> Option<NodeLink> {
        let input = self.input;
        let opener = self.brackets.last()?;
        let (text_pos, bracket_after) = (opener.text_pos, opener.bracket_after);

        let label = match scan_link_label(input, self.pos) {
            Some(end) if end - self.pos > 2 => {
                let label = &input[self.pos + 1..end - 1];
                self.pos = end;
                Some(label)
            }
            Some(end) => {
                self.pos = end;
                None
            }
            None => None,
        };
        let label = match label {
            Some(label) => label,
            None if !bracket_after => &input[text_pos..close_pos],
            None => return None,
        };
        if label.len() > 999 {
            return None;
        }

        let reference = self.refs.get(&*normalize_reference_label(label))?;
        Some(NodeLink {
            url: reference.href.clone(),
            title: reference.title.clone(),
        })
    }

    /// `<scheme:...>` or `<local@domain>`.
    pub(super) fn try_autolink(&mut self) -> Result<bool> {
        let start = self.pos + 1;
        let Some(len) = self.bytes[start..]
            .iter()
            .position(|&b| matches!(b, b'>' | b'<' | b' ' | b'\n' | b'\t') || b < 0x20)
        else {
            return Ok(false);
        };
        if self.bytes[start + len] != b'>' {
            return Ok(false);
        }
        let input = self.input;
        let content = &input[start..start + len];

        let url = if is_uri_autolink(content) {
            resolve_entities(content)
        } else if is_email_autolink(content) {
            format!("mailto:{content}")
        } else {
            return Ok(false);
        };

        let link = self.push_node(NodeValue::Link(NodeLink {
            url,
            title: String::new(),
        }))?;
        let text = self
            .arena
            .alloc(NodeValue::Text(content.to_owned()), Sourcepos::default())?;
        self.arena.get_mut(text).open = false;
        self.arena.append(link, text);
        self.pos = start + len + 1;
        Ok(true)
    }

    pub(super) fn try_html_inline(&mut self) -> Result<bool> {
        let (input, options) = (self.input, self.options);
        let rest = &input[self.pos..];
        let len = scan_html_tag(rest).or_else(|| {
            options
                .has(OptionFlags::LIBERAL_HTML_TAG)
                .then(|| scan_liberal_html_tag(rest))
                .flatten()
        });
        let Some(len) = len else {
            return Ok(false);
        };
        self.push_node(NodeValue::HtmlInline(rest[..len].to_owned()))?;
        self.pos += len;
        Ok(true)
    }

    pub(super) fn try_entity(&mut self) -> Result<bool> {
        let mut decoded = String::new();
        let Some(len) = entities::decode_entity_at(&self.input[self.pos..], &mut decoded) else {
            return Ok(false);
        };
        self.push_node(NodeValue::Text(decoded))?;
        self.pos += len;
        Ok(true)
    }
}

fn is_uri_autolink(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let scheme = s.as_bytes();
    (2..=32).contains(&colon)
        && scheme[0].is_ascii_alphabetic()
        && scheme[1..colon]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
}

/// Decodes character references, leaving everything else as written.
fn resolve_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match entities::decode_entity_at(rest, &mut out) {
            Some(n) => rest = &rest[n..],
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Length of the raw HTML construct at the start of `rest` (which starts
/// with `<`): an open or closing tag, comment, processing instruction,
/// declaration or CDATA section.
fn scan_html_tag(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();

    if rest.starts_with("<!--") {
        if rest.starts_with("<!-->") {
            return Some(5);
        }
        if rest.starts_with("<!--->") {
            return Some(6);
        }
        return rest[4..].find("-->").map(|end| end + 7);
    }
    if rest.starts_with("<?") {
        return rest[2..].find("?>").map(|end| end + 4);
    }
    if rest.starts_with("<![CDATA[") {
        return rest[9..].find("]]>").map(|end| end + 12);
    }
    if bytes.len() > 2 && bytes[1] == b'!' && bytes[2].is_ascii_alphabetic() {
        return rest.find('>').map(|end| end + 1);
    }

    let is_close = bytes.get(1) == Some(&b'/');
    let tstart = if is_close { 2 } else { 1 };
    if !bytes.get(tstart).is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let mut i = tstart + 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let skip_ws = |mut i: usize| {
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n') {
            i += 1;
        }
        i
    };

    if is_close {
        i = skip_ws(i);
        return (bytes.get(i) == Some(&b'>')).then_some(i + 1);
    }

    loop {
        let after_ws = skip_ws(i);
        let had_space = after_ws > i;
        i = after_ws;
        match bytes.get(i)? {
            b'>' => return Some(i + 1),
            b'/' => return (bytes.get(i + 1) == Some(&b'>')).then_some(i + 2),
            &b if had_space && (b.is_ascii_alphabetic() || b == b'_' || b == b':') => {}
            _ => return None,
        }
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b':' | b'.' | b'-'))
        {
            i += 1;
        }
        let name_end = i;
        i = skip_ws(i);
        if bytes.get(i) != Some(&b'=') {
            i = name_end;
            continue;
        }
        i = skip_ws(i + 1);
        match *bytes.get(i)? {
            quote @ (b'\'' | b'"') => {
                let close = bytes[i + 1..].iter().position(|&b| b == quote)?;
                i += close + 2;
            }
            b' ' | b'\t' | b'\n' | b'=' | b'<' | b'>' | b'`' => return None,
            _ => {
                while i < bytes.len()
                    && !matches!(
                        bytes[i],
                        b' ' | b'\t' | b'\n' | b'"' | b'\'' | b'=' | b'<' | b'>' | b'`'
                    )
                {
                    i += 1;
                }
            }
        }
    }
}

/// Anything up to the next `>` on the same line.
fn scan_liberal_html_tag(rest: &str) -> Option<usize> {
    let end = memchr::memchr2(b'>', b'\n', rest.as_bytes())?;
    (rest.as_bytes()[end] == b'>' && end > 1).then_some(end + 1)
}
