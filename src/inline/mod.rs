mod links;
mod scanner;

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;
use unicode_categories::UnicodeCategories;

use crate::arena::{Arena, NodeId};
use crate::error::Result;
use crate::extension::Enabled;
use crate::nodes::{NodeValue, Sourcepos};
use crate::options::Options;
use crate::tree::FootnoteMap;

pub(crate) use crate::is_ascii_punctuation;

/// Target of a link reference definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LinkReference {
    pub href: String,
    pub title: String,
}

pub(crate) type LinkRefMap = HashMap<String, LinkReference>;

/// Case-folds a label and collapses internal whitespace, so that labels
/// match the way CommonMark compares them.
pub(crate) fn normalize_reference_label(label: &str) -> Cow<'_, str> {
    let trimmed = label.trim();
    let bytes = trimmed.as_bytes();

    {
        let mut simple = true;
        let mut prev_space = false;
        for &b in bytes {
            if b.is_ascii_uppercase() {
                simple = false;
                break;
            }
            if b == b' ' {
                if prev_space {
                    simple = false;
                    break;
                }
                prev_space = true;
            } else if b == b'\t' || b == b'\n' || b == b'\r' || b >= 0x80 {
                simple = false;
                break;
            } else {
                prev_space = false;
            }
        }
        if simple {
            return Cow::Borrowed(trimmed);
        }
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_space = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        match c {
            'ß' | 'ẞ' => out.push_str("ss"),
            _ => out.extend(c.to_lowercase()),
        }
    }
    Cow::Owned(out)
}

/// A run of `*`, `_` or an extension delimiter byte, waiting for a partner.
#[derive(Debug)]
struct Delimiter {
    /// Text node holding the run; shrinks as delimiters are used up.
    node: NodeId,
    ch: u8,
    len: usize,
    orig_len: usize,
    can_open: bool,
    can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
    /// Extension that resolves this byte, if not core emphasis.
    ext: Option<usize>,
}

#[derive(Debug)]
struct Bracket {
    /// Text node holding `[` or `![`.
    node: NodeId,
    image: bool,
    active: bool,
    /// Another bracket opened after this one.
    bracket_after: bool,
    /// Last delimiter when the bracket was pushed.
    delim_bottom: Option<usize>,
    /// Offset just past the bracket.
    text_pos: usize,
}

pub(super) struct InlineScanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    arena: &'a mut Arena,
    parent: NodeId,
    refs: &'a LinkRefMap,
    footnotes: &'a mut FootnoteMap,
    options: &'a Options,
    enabled: &'a Enabled,
    delims: Vec<Delimiter>,
    last_delim: Option<usize>,
    brackets: Vec<Bracket>,
}

impl<'a> InlineScanner<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        input: &'a str,
        arena: &'a mut Arena,
        parent: NodeId,
        refs: &'a LinkRefMap,
        footnotes: &'a mut FootnoteMap,
        options: &'a Options,
        enabled: &'a Enabled,
    ) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            arena,
            parent,
            refs,
            footnotes,
            options,
            enabled,
            delims: Vec::new(),
            last_delim: None,
            brackets: Vec::new(),
        }
    }

    fn push_node(&mut self, value: NodeValue) -> Result<NodeId> {
        let id = self.arena.alloc(value, Sourcepos::default())?;
        self.arena.get_mut(id).open = false;
        self.arena.append(self.parent, id);
        Ok(id)
    }

    fn push_text(&mut self, text: &str) -> Result<Option<NodeId>> {
        if text.is_empty() {
            return Ok(None);
        }
        self.push_node(NodeValue::Text(text.to_owned())).map(Some)
    }

    fn flush_text_range(&mut self, start: usize, end: usize) -> Result<()> {
        if start < end {
            let text = &self.input[start..end];
            self.push_node(NodeValue::Text(text.to_owned()))?;
        }
        Ok(())
    }

    fn peek(&self, at: usize) -> u8 {
        self.bytes.get(at).copied().unwrap_or(0)
    }
}

/// Whether `value` carries raw text for the inline parser.
fn takes_inlines(value: &NodeValue, enabled: &Enabled) -> bool {
    match value {
        NodeValue::Paragraph | NodeValue::Heading(_) => true,
        NodeValue::Extension(node) => enabled
            .owner_of(node.kind)
            .is_some_and(|ext| ext.contains_inlines(node)),
        _ => false,
    }
}

/// Runs the inline parser over every leaf under `root`.
pub(crate) fn parse_document_inlines(
    arena: &mut Arena,
    root: NodeId,
    refs: &LinkRefMap,
    footnotes: &mut FootnoteMap,
    options: &Options,
    enabled: &Enabled,
) -> Result<()> {
    let leaves: Vec<NodeId> = arena
        .descendants(root)
        .filter(|&id| takes_inlines(arena.value(id), enabled))
        .collect();
    trace!(leaves = leaves.len(), "inline phase");

    for leaf in leaves {
        let content = std::mem::take(&mut arena.get_mut(leaf).content);
        let text = content.trim_start_matches('\n').trim_end_matches([' ', '\t', '\n']);
        if text.is_empty() {
            continue;
        }
        let mut scanner = InlineScanner::new(text, arena, leaf, refs, footnotes, options, enabled);
        scanner.scan_all()?;
        scanner.process_emphasis(None)?;
        merge_adjacent_text(arena, leaf);
    }
    Ok(())
}

/// Joins runs of sibling text nodes and drops empty ones.
fn merge_adjacent_text(arena: &mut Arena, parent: NodeId) {
    let nodes: Vec<NodeId> = arena.descendants(parent).collect();
    for node in nodes {
        if !matches!(arena.value(node), NodeValue::Text(_)) {
            continue;
        }
        let after_text = arena
            .previous_sibling(node)
            .is_some_and(|p| matches!(arena.value(p), NodeValue::Text(_)));
        if after_text {
            continue;
        }
        while let Some(next) = arena.next_sibling(node) {
            let NodeValue::Text(tail) = &mut arena.get_mut(next).value else {
                break;
            };
            let tail = std::mem::take(tail);
            if let NodeValue::Text(head) = &mut arena.get_mut(node).value {
                head.push_str(&tail);
            }
            arena.detach(next);
        }
        if matches!(arena.value(node), NodeValue::Text(t) if t.is_empty()) {
            arena.detach(node);
        }
    }
}

#[inline]
pub(crate) fn is_punctuation_char(c: char) -> bool {
    if c.is_ascii() {
        is_ascii_punctuation(c as u8)
    } else {
        c.is_punctuation() || c.is_symbol()
    }
}

#[inline]
pub(crate) fn is_unicode_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c') || c.is_separator_space()
}

/// Character before `byte_pos`, a newline at the start of input.
fn char_before(s: &str, byte_pos: usize) -> char {
    s[..byte_pos].chars().next_back().unwrap_or('\n')
}

/// Character at `byte_pos`, a newline past the end of input.
fn char_at(s: &str, byte_pos: usize) -> char {
    s.get(byte_pos..)
        .and_then(|rest| rest.chars().next())
        .unwrap_or('\n')
}

/// Whether a run of `marker` between `before` and `after` may open and
/// close emphasis.
fn flanking(marker: u8, before: char, after: char) -> (bool, bool) {
    let before_ws = is_unicode_whitespace(before);
    let after_ws = is_unicode_whitespace(after);
    let before_punct = is_punctuation_char(before);
    let after_punct = is_punctuation_char(after);

    let left = !after_ws && (!after_punct || before_ws || before_punct);
    let right = !before_ws && (!before_punct || after_ws || after_punct);

    if marker == b'_' {
        (left && (!right || before_punct), right && (!left || after_punct))
    } else {
        (left, right)
    }
}

fn is_email_autolink(s: &str) -> bool {
    let bytes = s.as_bytes();
    let Some(at) = bytes.iter().position(|&b| b == b'@') else {
        return false;
    };
    if at == 0 || at + 1 >= bytes.len() {
        return false;
    }
    let local_ok = bytes[..at].iter().all(|&b| {
        b.is_ascii_alphanumeric() || b"!#$%&'*+/=?^_`{|}~.-".contains(&b)
    });
    if !local_ok {
        return false;
    }
    bytes[at + 1..].split(|&b| b == b'.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.first() != Some(&b'-')
            && label.last() != Some(&b'-')
            && label.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fold_case_and_space() {
        assert_eq!(normalize_reference_label(" foo  Bar\n"), "foo bar");
        assert_eq!(normalize_reference_label("ẞ"), "ss");
        assert!(matches!(normalize_reference_label("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn flanking_rules() {
        assert_eq!(flanking(b'*', ' ', 'a'), (true, false));
        assert_eq!(flanking(b'*', 'a', ' '), (false, true));
        assert_eq!(flanking(b'*', 'a', 'b'), (true, true));
        assert_eq!(flanking(b'_', 'a', 'b'), (false, false));
        assert_eq!(flanking(b'_', '.', 'b'), (true, false));
    }

    #[test]
    fn email_autolinks() {
        assert!(is_email_autolink("foo@bar.example.com"));
        assert!(is_email_autolink("foo+special@Bar.baz-bar0.com"));
        assert!(!is_email_autolink("foo@"));
        assert!(!is_email_autolink("foo\\+@bar.example.com"));
        assert!(!is_email_autolink("a@-b.com"));
    }
}
