use crate::nodes::{ListDelimType, ListType};

/// `line` starts at the first non-space character.
pub(super) fn is_thematic_break(line: &str) -> bool {
    let mut marker: u8 = 0;
    let mut count: u32 = 0;
    for &b in line.as_bytes() {
        match b {
            b' ' | b'\t' => continue,
            b'*' | b'-' | b'_' => {
                if marker == 0 {
                    marker = b;
                } else if b != marker {
                    return false;
                }
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

/// Returns the heading level and the byte length of the opening sequence,
/// including the single space or tab that follows it.
pub(super) fn scan_atx_heading_start(line: &str) -> Option<(u8, usize)> {
    let bytes = line.as_bytes();
    let mut level = 0usize;
    while level < bytes.len() && bytes[level] == b'#' {
        level += 1;
        if level > 6 {
            return None;
        }
    }
    if level == 0 {
        return None;
    }
    match bytes.get(level) {
        None => Some((level as u8, level)),
        Some(b' ' | b'\t') => Some((level as u8, level + 1)),
        _ => None,
    }
}

/// Heading content with the optional closing `#` sequence removed.
pub(super) fn strip_closing_hashes(s: &str) -> &str {
    let s = s.trim_matches(|c| c == ' ' || c == '\t');
    let bytes = s.as_bytes();
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b'#' {
        end -= 1;
    }
    if end == bytes.len() {
        return s;
    }
    if end == 0 {
        return "";
    }
    if bytes[end - 1] == b' ' || bytes[end - 1] == b'\t' {
        s[..end].trim_end_matches([' ', '\t'])
    } else {
        s
    }
}

/// Level of a setext underline (`===` is 1, `---` is 2).
pub(super) fn scan_setext_underline(line: &str) -> Option<u8> {
    let trimmed = line.trim_end_matches([' ', '\t']);
    let bytes = trimmed.as_bytes();
    let ch = *bytes.first()?;
    if ch != b'=' && ch != b'-' {
        return None;
    }
    if !bytes.iter().all(|&b| b == ch) {
        return None;
    }
    Some(if ch == b'=' { 1 } else { 2 })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct FenceStart<'a> {
    pub fence_char: u8,
    pub fence_len: usize,
    pub info: &'a str,
}

pub(super) fn scan_fence_start(line: &str) -> Option<FenceStart<'_>> {
    let bytes = line.as_bytes();
    let ch = *bytes.first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let count = bytes.iter().take_while(|&&b| b == ch).count();
    if count < 3 {
        return None;
    }
    let info = line[count..].trim_matches(|c: char| c.is_ascii_whitespace());
    if ch == b'`' && info.contains('`') {
        return None;
    }
    Some(FenceStart {
        fence_char: ch,
        fence_len: count,
        info,
    })
}

/// Length of the closing fence run, when `line` is one.
pub(super) fn scan_closing_fence(line: &str, fence_char: u8) -> Option<usize> {
    let bytes = line.as_bytes();
    let count = bytes.iter().take_while(|&&b| b == fence_char).count();
    if count < 3 {
        return None;
    }
    if bytes[count..].iter().all(|&b| b == b' ' || b == b'\t') {
        Some(count)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ListMarkerInfo {
    pub list_type: ListType,
    pub delimiter: ListDelimType,
    pub bullet_char: u8,
    /// Bytes taken by the marker itself (`-` is 1, `10.` is 3).
    pub marker_len: usize,
    pub start_num: u32,
    /// Nothing but blanks after the marker.
    pub is_empty_item: bool,
}

#[inline]
pub(super) fn parse_list_marker(line: &str) -> Option<ListMarkerInfo> {
    let bytes = line.as_bytes();
    let b0 = *bytes.first()?;
    let rest_is_blank = |from: usize| bytes[from..].iter().all(|&b| b == b' ' || b == b'\t');

    if matches!(b0, b'-' | b'*' | b'+') {
        if bytes.len() == 1 || bytes[1] == b' ' || bytes[1] == b'\t' {
            return Some(ListMarkerInfo {
                list_type: ListType::Bullet,
                delimiter: ListDelimType::Period,
                bullet_char: b0,
                marker_len: 1,
                start_num: 0,
                is_empty_item: rest_is_blank(1),
            });
        }
        return None;
    }

    if b0.is_ascii_digit() {
        let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > 9 {
            return None;
        }
        let delim = *bytes.get(digits)?;
        if delim != b'.' && delim != b')' {
            return None;
        }
        let after = digits + 1;
        if after < bytes.len() && bytes[after] != b' ' && bytes[after] != b'\t' {
            return None;
        }
        let start_num = line[..digits].parse::<u32>().ok()?;
        return Some(ListMarkerInfo {
            list_type: ListType::Ordered,
            delimiter: if delim == b'.' {
                ListDelimType::Period
            } else {
                ListDelimType::Paren
            },
            bullet_char: 0,
            marker_len: after,
            start_num,
            is_empty_item: rest_is_blank(after),
        });
    }

    None
}

pub(super) fn can_interrupt_paragraph(marker: &ListMarkerInfo) -> bool {
    if marker.is_empty_item {
        return false;
    }
    match marker.list_type {
        ListType::Bullet => true,
        ListType::Ordered => marker.start_num == 1,
    }
}
