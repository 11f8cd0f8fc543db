static NEEDS_ESCAPE: [bool; 256] = {
    let mut t = [false; 256];
    t[b'&' as usize] = true;
    t[b'<' as usize] = true;
    t[b'>' as usize] = true;
    t[b'"' as usize] = true;
    t
};

#[cfg(test)]
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_html_into(&mut out, input);
    out
}

#[inline]
pub(crate) fn escape_html_into(out: &mut String, input: &str) {
    let bytes = input.as_bytes();
    let mut last = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if !NEEDS_ESCAPE[b as usize] {
            continue;
        }
        let replacement = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            _ => "&quot;",
        };
        out.push_str(&input[last..i]);
        out.push_str(replacement);
        last = i + 1;
    }
    out.push_str(&input[last..]);
}

static HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

pub(crate) static URL_HTML_SAFE: [bool; 256] = {
    let mut t = [false; 256];
    let mut i = b'A';
    while i <= b'Z' {
        t[i as usize] = true;
        i += 1;
    }
    let mut i = b'a';
    while i <= b'z' {
        t[i as usize] = true;
        i += 1;
    }
    let mut i = b'0';
    while i <= b'9' {
        t[i as usize] = true;
        i += 1;
    }
    let extra = b"-_.~!*'();/?:@=+$,#";
    let mut j = 0;
    while j < extra.len() {
        t[extra[j] as usize] = true;
        j += 1;
    }
    t
};

/// Percent-encodes bytes outside the URL-safe set and HTML-escapes `&`.
/// Existing `%XX` escapes are kept as they are.
pub(crate) fn encode_url_escaped_into(out: &mut String, url: &str) {
    let bytes = url.as_bytes();
    let len = bytes.len();
    let mut last = 0;
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        if URL_HTML_SAFE[b as usize] {
            i += 1;
            continue;
        }
        if b == b'%'
            && i + 2 < len
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        out.push_str(&url[last..i]);
        if b == b'&' {
            out.push_str("&amp;");
            i += 1;
        } else {
            // Non-ASCII runs are encoded whole so `last` stays on a char boundary.
            let end = if b.is_ascii() {
                i + 1
            } else {
                i + bytes[i..].iter().take_while(|b| !b.is_ascii()).count()
            };
            for &b in &bytes[i..end] {
                out.push('%');
                out.push(HEX_CHARS[(b >> 4) as usize] as char);
                out.push(HEX_CHARS[(b & 0xF) as usize] as char);
            }
            i = end;
        }
        last = i;
    }
    out.push_str(&url[last..]);
}

/// Schemes whose links are blanked unless raw HTML is allowed.
/// `data:` is allowed for a handful of raster image types.
pub(crate) fn is_dangerous_url(url: &str) -> bool {
    let trimmed = url.trim_start();
    let head = trimmed.get(..trimmed.len().min(16)).unwrap_or(trimmed);
    let lower = head.to_ascii_lowercase();

    if lower.starts_with("javascript:") || lower.starts_with("vbscript:") || lower.starts_with("file:")
    {
        return true;
    }
    if lower.starts_with("data:") {
        let rest = &lower["data:".len()..];
        return !["image/png", "image/gif", "image/jpeg", "image/webp"]
            .iter()
            .any(|ok| rest.starts_with(ok));
    }
    false
}
