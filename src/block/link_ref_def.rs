use crate::entities;
use crate::is_ascii_punctuation;

/// A link reference definition lifted out of paragraph content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkRefDef {
    /// The label as written, escapes intact. Normalized when stored.
    pub label: String,
    pub url: String,
    pub title: String,
}

/// Parses one definition at the start of `input`, returning it with the
/// number of bytes it spans (including its trailing newline).
pub(crate) fn parse_link_ref_def(input: &str) -> Option<(LinkRefDef, usize)> {
    let bytes = input.as_bytes();
    let label_end = scan_link_label(input, 0)?;
    let label = &input[1..label_end - 1];
    if label.trim().is_empty() {
        return None;
    }

    let mut i = label_end;
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i += 1;
    i = skip_spaces_and_optional_newline(bytes, i);

    let (url, dest_end) = parse_link_destination(input, i)?;
    i = dest_end;

    let before_title = i;
    let title_start = skip_spaces_and_optional_newline(bytes, i);
    if title_start < bytes.len() && title_start > before_title {
        if let Some((title, t_end)) = parse_link_title(input, title_start) {
            let after = skip_line_spaces(bytes, t_end);
            if after >= bytes.len() || bytes[after] == b'\n' {
                let consumed = (after + 1).min(bytes.len());
                return Some((
                    LinkRefDef {
                        label: label.to_owned(),
                        url,
                        title,
                    },
                    consumed,
                ));
            }
        }
    }

    let after_dest = skip_line_spaces(bytes, before_title);
    if after_dest < bytes.len() && bytes[after_dest] != b'\n' {
        return None;
    }
    let consumed = (after_dest + 1).min(bytes.len());
    Some((
        LinkRefDef {
            label: label.to_owned(),
            url,
            title: String::new(),
        },
        consumed,
    ))
}

/// Scans a `[label]` starting at `start`. Returns the index just past the
/// closing bracket. Labels hold at most 999 characters and no unescaped
/// brackets.
pub(crate) fn scan_link_label(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b']' => {
                return if i - start - 1 > 999 {
                    None
                } else {
                    Some(i + 1)
                };
            }
            b'[' => return None,
            b'\\' if i + 1 < bytes.len() => i += 2,
            _ => i += 1,
        }
        if i - start > 1000 {
            return None;
        }
    }
    None
}

/// Applies backslash escapes and character references.
pub(crate) fn unescape_and_resolve(s: &str) -> String {
    let bytes = s.as_bytes();
    if memchr::memchr2(b'\\', b'&', bytes).is_none() {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && is_ascii_punctuation(bytes[i + 1]) => {
                out.push_str(&s[last..i]);
                out.push(bytes[i + 1] as char);
                i += 2;
                last = i;
            }
            b'&' => {
                out.push_str(&s[last..i]);
                match entities::decode_entity_at(&s[i..], &mut out) {
                    Some(n) => i += n,
                    None => {
                        out.push('&');
                        i += 1;
                    }
                }
                last = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&s[last..]);
    out
}

pub(crate) fn skip_spaces_and_optional_newline(bytes: &[u8], i: usize) -> usize {
    let mut i = skip_line_spaces(bytes, i);
    if i < bytes.len() && bytes[i] == b'\n' {
        i = skip_line_spaces(bytes, i + 1);
    }
    i
}

pub(crate) fn skip_line_spaces(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// Parses a link destination at `start`, resolved. Returns the end index.
pub(crate) fn parse_link_destination(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    if start >= bytes.len() {
        return None;
    }

    if bytes[start] == b'<' {
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => return Some((unescape_and_resolve(&input[start + 1..i]), i + 1)),
                b'<' | b'\n' => return None,
                b'\\' if i + 1 < bytes.len() && bytes[i + 1] != b'\n' => i += 2,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = start;
    let mut depth = 0u32;
    while i < bytes.len() {
        let b = bytes[i];
        if b <= b' ' || b == 0x7f {
            break;
        }
        match b {
            b'(' => {
                depth += 1;
                if depth > 32 {
                    return None;
                }
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            b'\\' if i + 1 < bytes.len() && is_ascii_punctuation(bytes[i + 1]) => i += 1,
            _ => {}
        }
        i += 1;
    }
    if depth != 0 || i == start {
        return None;
    }
    Some((unescape_and_resolve(&input[start..i]), i))
}

/// Parses a quoted or parenthesized title at `start`, resolved.
pub(crate) fn parse_link_title(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let open = *bytes.get(start)?;
    let close = match open {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == close {
            return Some((unescape_and_resolve(&input[start + 1..i]), i + 1));
        }
        if b == b'(' && open == b'(' {
            return None;
        }
        if b == b'\\' && i + 1 < bytes.len() && is_ascii_punctuation(bytes[i + 1]) {
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}
