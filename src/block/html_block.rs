/// How an HTML block is terminated. The variant order follows the seven
/// CommonMark start conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HtmlBlockEnd {
    /// `<pre`, `<script`, `<style`, `<textarea`: ends at any of their closing tags.
    RawTag,
    Comment,
    ProcessingInstruction,
    Declaration,
    Cdata,
    /// Known block-level tag: ends at a blank line.
    BlockTag,
    /// Any other complete tag alone on its line: ends at a blank line.
    CompleteTag,
}

impl HtmlBlockEnd {
    pub(super) fn block_type(self) -> u8 {
        match self {
            Self::RawTag => 1,
            Self::Comment => 2,
            Self::ProcessingInstruction => 3,
            Self::Declaration => 4,
            Self::Cdata => 5,
            Self::BlockTag => 6,
            Self::CompleteTag => 7,
        }
    }

    /// Types 6 and 7 end at the first blank line, which fails continuation.
    pub(super) fn ends_at_blank(self) -> bool {
        matches!(self, Self::BlockTag | Self::CompleteTag)
    }
}

static RAW_TAGS: [&str; 4] = ["pre", "script", "style", "textarea"];

pub(super) static HTML_BLOCK_TYPE6_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "base",
    "basefont",
    "blockquote",
    "body",
    "caption",
    "center",
    "col",
    "colgroup",
    "dd",
    "details",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hr",
    "html",
    "iframe",
    "legend",
    "li",
    "link",
    "main",
    "menu",
    "menuitem",
    "nav",
    "noframes",
    "ol",
    "optgroup",
    "option",
    "p",
    "param",
    "search",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "template",
    "tfoot",
    "th",
    "thead",
    "title",
    "tr",
    "track",
    "ul",
];

fn starts_with_tag_ci(bytes: &[u8], tag: &[u8]) -> bool {
    if bytes.len() < 1 + tag.len() || bytes[0] != b'<' {
        return false;
    }
    if !bytes[1..=tag.len()].eq_ignore_ascii_case(tag) {
        return false;
    }
    matches!(
        bytes.get(1 + tag.len()),
        None | Some(b' ' | b'\t' | b'>' | b'\n')
    )
}

/// `line` starts at the first non-space character. Type 7 blocks cannot
/// interrupt a paragraph.
pub(super) fn parse_html_block_start(line: &str, in_paragraph: bool) -> Option<HtmlBlockEnd> {
    let bytes = line.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }

    if RAW_TAGS
        .iter()
        .any(|tag| starts_with_tag_ci(bytes, tag.as_bytes()))
    {
        return Some(HtmlBlockEnd::RawTag);
    }
    if bytes.starts_with(b"<!--") {
        return Some(HtmlBlockEnd::Comment);
    }
    if bytes.starts_with(b"<?") {
        return Some(HtmlBlockEnd::ProcessingInstruction);
    }
    if bytes.len() > 2 && bytes[1] == b'!' && bytes[2].is_ascii_alphabetic() {
        return Some(HtmlBlockEnd::Declaration);
    }
    if bytes.starts_with(b"<![CDATA[") {
        return Some(HtmlBlockEnd::Cdata);
    }
    if is_html_block_type6(bytes) {
        return Some(HtmlBlockEnd::BlockTag);
    }
    if !in_paragraph && is_html_block_type7(bytes) {
        return Some(HtmlBlockEnd::CompleteTag);
    }
    None
}

fn is_html_block_type6(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }
    let start = if bytes[1] == b'/' { 2 } else { 1 };
    let end = start
        + bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
    if end == start || end - start > 10 {
        return false;
    }
    match bytes.get(end) {
        None | Some(b' ' | b'\t' | b'>' | b'\n') => {}
        Some(b'/') if bytes.get(end + 1) == Some(&b'>') => {}
        _ => return false,
    }
    let mut buf = [0u8; 10];
    let tag = &mut buf[..end - start];
    tag.copy_from_slice(&bytes[start..end]);
    tag.make_ascii_lowercase();
    HTML_BLOCK_TYPE6_TAGS
        .binary_search_by(|t| t.as_bytes().cmp(tag))
        .is_ok()
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

fn is_html_block_type7(bytes: &[u8]) -> bool {
    if bytes.len() < 3 {
        return false;
    }
    let is_close = bytes[1] == b'/';
    let mut i = if is_close { 2 } else { 1 };
    if i >= bytes.len() || !bytes[i].is_ascii_alphabetic() {
        return false;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }

    if is_close {
        i = skip_spaces(bytes, i);
        if bytes.get(i) != Some(&b'>') {
            return false;
        }
        i += 1;
    } else {
        loop {
            let before = i;
            i = skip_spaces(bytes, i);
            let had_space = i > before;
            match bytes.get(i) {
                None => return false,
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') => {
                    if bytes.get(i + 1) != Some(&b'>') {
                        return false;
                    }
                    i += 2;
                    break;
                }
                Some(&b) => {
                    if !had_space || !(b.is_ascii_alphabetic() || b == b'_' || b == b':') {
                        return false;
                    }
                }
            }
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b':' | b'.' | b'-'))
            {
                i += 1;
            }
            let after_name = skip_spaces(bytes, i);
            if bytes.get(after_name) != Some(&b'=') {
                continue;
            }
            i = skip_spaces(bytes, after_name + 1);
            match bytes.get(i) {
                None => return false,
                Some(&quote @ (b'\'' | b'"')) => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        i += 1;
                    }
                    if i >= bytes.len() {
                        return false;
                    }
                    i += 1;
                }
                Some(_) => {
                    let start = i;
                    while i < bytes.len()
                        && !matches!(
                            bytes[i],
                            b' ' | b'\t' | b'"' | b'\'' | b'=' | b'<' | b'>' | b'`'
                        )
                    {
                        i += 1;
                    }
                    if i == start {
                        return false;
                    }
                }
            }
        }
    }

    bytes[i..].iter().all(|&b| b == b' ' || b == b'\t')
}

fn contains_ci(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}

pub(super) fn html_block_ends(condition: HtmlBlockEnd, line: &str) -> bool {
    match condition {
        HtmlBlockEnd::RawTag => ["</pre>", "</script>", "</style>", "</textarea>"]
            .iter()
            .any(|tag| contains_ci(line.as_bytes(), tag.as_bytes())),
        HtmlBlockEnd::Comment => line.contains("-->"),
        HtmlBlockEnd::ProcessingInstruction => line.contains("?>"),
        HtmlBlockEnd::Declaration => line.contains('>'),
        HtmlBlockEnd::Cdata => line.contains("]]>"),
        HtmlBlockEnd::BlockTag | HtmlBlockEnd::CompleteTag => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_conditions() {
        assert_eq!(parse_html_block_start("<pre>", false), Some(HtmlBlockEnd::RawTag));
        assert_eq!(parse_html_block_start("<SCRIPT type=x>", false), Some(HtmlBlockEnd::RawTag));
        assert_eq!(parse_html_block_start("<!-- c", false), Some(HtmlBlockEnd::Comment));
        assert_eq!(parse_html_block_start("<?php", false), Some(HtmlBlockEnd::ProcessingInstruction));
        assert_eq!(parse_html_block_start("<!DOCTYPE html>", false), Some(HtmlBlockEnd::Declaration));
        assert_eq!(parse_html_block_start("<![CDATA[", false), Some(HtmlBlockEnd::Cdata));
        assert_eq!(parse_html_block_start("<div class=\"x\">", true), Some(HtmlBlockEnd::BlockTag));
        assert_eq!(parse_html_block_start("</table>", false), Some(HtmlBlockEnd::BlockTag));
        assert_eq!(parse_html_block_start("<hr/>", false), Some(HtmlBlockEnd::BlockTag));
    }

    #[test]
    fn complete_tags_only_outside_paragraphs() {
        assert_eq!(parse_html_block_start("<a href=\"x\">", false), Some(HtmlBlockEnd::CompleteTag));
        assert_eq!(parse_html_block_start("<a href=\"x\">", true), None);
        assert_eq!(parse_html_block_start("</custom-el >", false), Some(HtmlBlockEnd::CompleteTag));
        assert_eq!(parse_html_block_start("<a href=\"x\"> text", false), None);
        assert_eq!(parse_html_block_start("<a h='1'b>", false), None);
    }

    #[test]
    fn end_conditions() {
        assert!(html_block_ends(HtmlBlockEnd::RawTag, "x </STYLE>"));
        assert!(html_block_ends(HtmlBlockEnd::Comment, "-->"));
        assert!(!html_block_ends(HtmlBlockEnd::BlockTag, "anything"));
        assert_eq!(HtmlBlockEnd::CompleteTag.block_type(), 7);
    }
}
