use std::collections::HashMap;
use std::sync::LazyLock;

/// Longest named reference in the HTML5 table (`&CounterClockwiseContourIntegral;`).
pub(crate) const MAX_ENTITY_LEN: usize = 32;

static NAMED: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    ::entities::ENTITIES
        .iter()
        .filter_map(|e| {
            let name = e.entity.strip_prefix('&')?.strip_suffix(';')?;
            Some((name, e.characters))
        })
        .collect()
});

/// Looks up a named character reference, without the surrounding `&` and `;`.
#[inline]
pub(crate) fn lookup_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => return Some("&"),
        "lt" => return Some("<"),
        "gt" => return Some(">"),
        "quot" => return Some("\""),
        "nbsp" => return Some("\u{a0}"),
        _ => {}
    }
    NAMED.get(name).copied()
}

#[inline]
pub(crate) fn lookup_entity_into(name: &str, out: &mut String) -> bool {
    match lookup_entity(name) {
        Some(chars) => {
            out.push_str(chars);
            true
        }
        None => false,
    }
}

/// Resolves a decimal or hexadecimal numeric reference. Code point zero and
/// invalid scalar values become U+FFFD.
pub(crate) fn resolve_numeric_ref_into(value: &str, hex: bool, out: &mut String) -> bool {
    let parsed = if hex {
        u32::from_str_radix(value, 16)
    } else {
        value.parse::<u32>()
    };
    let Ok(cp) = parsed else {
        return false;
    };
    let c = if cp == 0 {
        '\u{FFFD}'
    } else {
        char::from_u32(cp).unwrap_or('\u{FFFD}')
    };
    out.push(c);
    true
}

/// Tries to decode a character reference starting at `bytes[0] == b'&'`.
/// Returns the number of bytes consumed on success.
pub(crate) fn decode_entity_at(input: &str, out: &mut String) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'&' {
        return None;
    }
    if bytes[1] == b'#' {
        let (hex, start) = match bytes.get(2) {
            Some(b'x' | b'X') => (true, 3),
            _ => (false, 2),
        };
        let max_digits = if hex { 6 } else { 7 };
        let mut end = start;
        while end < bytes.len()
            && end - start < max_digits
            && (if hex {
                bytes[end].is_ascii_hexdigit()
            } else {
                bytes[end].is_ascii_digit()
            })
        {
            end += 1;
        }
        if end == start || bytes.get(end) != Some(&b';') {
            return None;
        }
        if resolve_numeric_ref_into(&input[start..end], hex, out) {
            return Some(end + 1);
        }
        return None;
    }

    let mut end = 1;
    while end < bytes.len() && end <= MAX_ENTITY_LEN && bytes[end].is_ascii_alphanumeric() {
        end += 1;
    }
    if end == 1 || bytes.get(end) != Some(&b';') {
        return None;
    }
    if lookup_entity_into(&input[1..end], out) {
        Some(end + 1)
    } else {
        None
    }
}
