use super::{InlineCursor, InlineMatch, SyntaxExtension, TreeMut};
use crate::arena::NodeId;
use crate::error::Result;
use crate::nodes::{NodeLink, NodeValue, Sourcepos};

const SCHEMES: [&str; 3] = ["http://", "https://", "ftp://"];

/// Bare `www.` domains, `http(s)://`/`ftp://` URLs and email addresses become
/// links without angle brackets.
///
/// URLs are matched by inline triggers. Emails are found after the inline
/// phase, over merged text runs, since `_` in a local part is an emphasis
/// delimiter and splits the text while scanning.
#[derive(Debug, Default, Clone, Copy)]
pub struct Autolink;

impl SyntaxExtension for Autolink {
    fn name(&self) -> &'static str {
        "autolink"
    }

    fn inline_triggers(&self) -> &'static [u8] {
        b"wfh"
    }

    fn parse_inline(&self, cursor: &mut InlineCursor<'_>) -> Option<InlineMatch> {
        if !at_boundary(cursor.char_before()) {
            return None;
        }
        let rest = cursor.rest();
        match_www(rest).or_else(|| match_scheme(rest))
    }

    fn post_process(&self, tree: &mut TreeMut<'_>) -> Result<()> {
        let mut stack = vec![tree.root()];
        while let Some(parent) = stack.pop() {
            let mut run = Vec::new();
            for child in tree.children(parent) {
                match tree.value(child) {
                    NodeValue::Text(_) => {
                        run.push(child);
                        continue;
                    }
                    NodeValue::Link(_) | NodeValue::Image(_) => {}
                    _ => stack.push(child),
                }
                link_emails(tree, &run)?;
                run.clear();
            }
            link_emails(tree, &run)?;
        }
        Ok(())
    }
}

/// Merges a run of sibling text nodes and splits any email addresses in it
/// out into links.
fn link_emails(tree: &mut TreeMut<'_>, run: &[NodeId]) -> Result<()> {
    let has_at = run
        .iter()
        .any(|&id| matches!(tree.value(id), NodeValue::Text(s) if s.contains('@')));
    let Some((&first, rest)) = run.split_first() else {
        return Ok(());
    };
    if !has_at {
        return Ok(());
    }

    let mut text = String::new();
    for &id in run {
        if let NodeValue::Text(s) = tree.value(id) {
            text.push_str(s);
        }
    }
    for &id in rest {
        tree.detach(id);
    }

    let mut anchor = first;
    let mut copied = 0;
    for at in memchr::memchr_iter(b'@', text.as_bytes()) {
        if at < copied {
            continue;
        }
        let Some((start, end)) = email_range(&text, copied, at) else {
            continue;
        };
        let address = &text[start..end];
        let link = tree.alloc(
            NodeValue::Link(NodeLink {
                url: format!("mailto:{address}"),
                title: String::new(),
            }),
            Sourcepos::default(),
        )?;
        let label = tree.alloc(NodeValue::Text(address.to_owned()), Sourcepos::default())?;
        tree.append(link, label);

        if anchor == first && copied == 0 {
            *tree.value_mut(first) = NodeValue::Text(text[..start].to_owned());
        } else if start > copied {
            let before = tree.alloc(NodeValue::Text(text[copied..start].to_owned()), Sourcepos::default())?;
            tree.insert_after(anchor, before);
            anchor = before;
        }
        tree.insert_after(anchor, link);
        anchor = link;
        copied = end;
    }

    if copied == 0 {
        *tree.value_mut(first) = NodeValue::Text(text);
        return Ok(());
    }
    if matches!(tree.value(first), NodeValue::Text(s) if s.is_empty()) {
        tree.detach(first);
    }
    if copied < text.len() {
        let after = tree.alloc(NodeValue::Text(text[copied..].to_owned()), Sourcepos::default())?;
        tree.insert_after(anchor, after);
    }
    Ok(())
}

/// Extended autolinks start at the beginning of a line, after whitespace, or
/// after one of `*`, `_`, `~` and `(`.
fn at_boundary(before: Option<char>) -> bool {
    before.is_none_or(|c| c.is_whitespace() || matches!(c, '*' | '_' | '~' | '('))
}

fn link_match(url: String, text: &str, advance: usize) -> InlineMatch {
    InlineMatch {
        rewind: 0,
        advance,
        value: NodeValue::Link(NodeLink {
            url,
            title: String::new(),
        }),
        text: Some(text.to_owned()),
    }
}

fn match_www(rest: &str) -> Option<InlineMatch> {
    if !rest.starts_with("www.") {
        return None;
    }
    let domain = domain_len(&rest[4..], false)?;
    let end = link_end(rest, 4 + domain);
    let text = &rest[..end];
    Some(link_match(format!("http://{text}"), text, end))
}

fn match_scheme(rest: &str) -> Option<InlineMatch> {
    let scheme = SCHEMES.iter().find(|s| rest.starts_with(*s))?;
    let domain = domain_len(&rest[scheme.len()..], false)?;
    let end = link_end(rest, scheme.len() + domain);
    let text = &rest[..end];
    Some(link_match(text.to_owned(), text, end))
}

/// Byte range of `local@domain.tld` around the `@` at `at`. The local part
/// does not reach back before `floor`.
fn email_range(text: &str, floor: usize, at: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let local = bytes[floor..at]
        .iter()
        .rev()
        .take_while(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b'+'))
        .count();
    if local == 0 {
        return None;
    }

    let mut end = at + 1;
    let mut dots = 0;
    while end < bytes.len() {
        match bytes[end] {
            b'.' if end + 1 < bytes.len() && bytes[end + 1].is_ascii_alphanumeric() => dots += 1,
            b'.' => break,
            b if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' => {}
            _ => break,
        }
        end += 1;
    }
    if dots == 0 || end == at + 1 || matches!(bytes[end - 1], b'-' | b'_') {
        return None;
    }
    Some((at - local, end))
}

/// Byte length of a domain at the start of `s`: alphanumeric segments with
/// `-` and `_`, separated by `.`. The last two segments may not contain `_`.
fn domain_len(s: &str, require_dot: bool) -> Option<usize> {
    if !s.chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    let mut end = 0;
    let mut dots = 0;
    let (mut underscores_last, mut underscores_prev) = (0, 0);
    for (i, c) in s.char_indices() {
        match c {
            '_' => underscores_last += 1,
            '.' => {
                underscores_prev = underscores_last;
                underscores_last = 0;
                dots += 1;
            }
            '-' => {}
            c if c.is_alphanumeric() => {}
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if end == 0 || underscores_last > 0 || underscores_prev > 0 || (require_dot && dots == 0) {
        return None;
    }
    Some(end)
}

/// Extends a match past its domain up to whitespace or `<`, then trims
/// trailing punctuation, unbalanced `)` and entity-like suffixes.
fn link_end(s: &str, domain_end: usize) -> usize {
    let bytes = s.as_bytes();
    let mut end = bytes[domain_end..]
        .iter()
        .position(|&b| b.is_ascii_whitespace() || b == b'<')
        .map_or(bytes.len(), |i| domain_end + i);

    while end > 0 {
        match bytes[end - 1] {
            b'?' | b'!' | b'.' | b',' | b':' | b'*' | b'_' | b'~' | b'\'' | b'"' => end -= 1,
            b';' => {
                let name_start = bytes[..end - 1]
                    .iter()
                    .rposition(|b| !b.is_ascii_alphanumeric())
                    .map_or(0, |i| i + 1);
                if name_start < end - 1 && name_start > 0 && bytes[name_start - 1] == b'&' {
                    end = name_start - 1;
                } else {
                    end -= 1;
                }
            }
            b')' => {
                let opening = bytes[..end].iter().filter(|&&b| b == b'(').count();
                let closing = bytes[..end].iter().filter(|&&b| b == b')').count();
                if closing <= opening {
                    break;
                }
                end -= 1;
            }
            _ => break,
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Options, markdown_to_html};

    fn autolink(input: &str) -> String {
        markdown_to_html(input, &Options::default().with_extension("autolink")).unwrap()
    }

    #[test]
    fn www_links_get_http() {
        assert_eq!(
            autolink("www.commonmark.org"),
            "<p><a href=\"http://www.commonmark.org\">www.commonmark.org</a></p>\n"
        );
        assert_eq!(
            autolink("Visit www.commonmark.org/help for more information."),
            "<p>Visit <a href=\"http://www.commonmark.org/help\">www.commonmark.org/help</a> for more information.</p>\n"
        );
    }

    #[test]
    fn scheme_links_trim_trailing_punctuation() {
        assert_eq!(
            autolink("Visit us at https://github.com!"),
            "<p>Visit us at <a href=\"https://github.com\">https://github.com</a>!</p>\n"
        );
    }

    #[test]
    fn parentheses_balance() {
        assert_eq!(
            autolink("www.google.com/search?q=Markup+(business))"),
            "<p><a href=\"http://www.google.com/search?q=Markup+(business)\">www.google.com/search?q=Markup+(business)</a>)</p>\n"
        );
        assert_eq!(
            autolink("(www.google.com/search?q=Markup+(business))"),
            "<p>(<a href=\"http://www.google.com/search?q=Markup+(business)\">www.google.com/search?q=Markup+(business)</a>)</p>\n"
        );
    }

    #[test]
    fn entity_like_suffix_is_excluded() {
        assert_eq!(
            autolink("www.google.com/search?q=commonmark&hl;"),
            "<p><a href=\"http://www.google.com/search?q=commonmark\">www.google.com/search?q=commonmark</a>&amp;hl;</p>\n"
        );
    }

    #[test]
    fn stops_at_angle_bracket() {
        assert_eq!(
            autolink("www.commonmark.org/he<lp"),
            "<p><a href=\"http://www.commonmark.org/he\">www.commonmark.org/he</a>&lt;lp</p>\n"
        );
    }

    #[test]
    fn emails() {
        assert_eq!(
            autolink("foo@bar.baz"),
            "<p><a href=\"mailto:foo@bar.baz\">foo@bar.baz</a></p>\n"
        );
        assert_eq!(
            autolink("hello@mail+xyz.example isn't valid, but hello+xyz@mail.example is."),
            "<p>hello@mail+xyz.example isn't valid, but <a href=\"mailto:hello+xyz@mail.example\">hello+xyz@mail.example</a> is.</p>\n"
        );
        assert_eq!(autolink("a.b-c_d@a.b."), "<p><a href=\"mailto:a.b-c_d@a.b\">a.b-c_d@a.b</a>.</p>\n");
        assert_eq!(autolink("a.b-c_d@a.b-"), "<p>a.b-c_d@a.b-</p>\n");
    }

    #[test]
    fn needs_a_boundary() {
        assert_eq!(autolink("xwww.example.com"), "<p>xwww.example.com</p>\n");
        assert_eq!(autolink("www. example"), "<p>www. example</p>\n");
    }

    #[test]
    fn domains() {
        assert_eq!(domain_len("example.com/x", true), Some(11));
        assert_eq!(domain_len("localhost", false), Some(9));
        assert_eq!(domain_len("localhost", true), None);
        assert_eq!(domain_len("a_b.example.com", true), Some(15));
        assert_eq!(domain_len("www.ex_ample.com", true), None);
        assert_eq!(domain_len(".com", false), None);
    }
}
