use std::borrow::Cow;

use super::SyntaxExtension;

/// Tags GitHub refuses to pass through even in unsafe mode.
const FILTERED_TAGS: [&str; 9] = [
    "title",
    "textarea",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "script",
    "plaintext",
];

/// Neutralizes a fixed set of raw HTML tags by escaping their `<`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tagfilter;

impl SyntaxExtension for Tagfilter {
    fn name(&self) -> &'static str {
        "tagfilter"
    }

    fn filter_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        let bytes = html.as_bytes();
        let mut out: Option<String> = None;
        let mut copied = 0;

        for pos in memchr::memchr_iter(b'<', bytes) {
            if !is_filtered_tag(&bytes[pos..]) {
                continue;
            }
            let out = out.get_or_insert_with(|| String::with_capacity(html.len() + 8));
            out.push_str(&html[copied..pos]);
            out.push_str("&lt;");
            copied = pos + 1;
        }

        match out {
            Some(mut out) => {
                out.push_str(&html[copied..]);
                Cow::Owned(out)
            }
            None => Cow::Borrowed(html),
        }
    }
}

/// Whether `tag` (starting at `<`) opens or closes a filtered tag: the name
/// must be followed by whitespace, `>` or `/>`.
fn is_filtered_tag(tag: &[u8]) -> bool {
    let name_start = if tag.get(1) == Some(&b'/') { 2 } else { 1 };
    let rest = &tag[name_start.min(tag.len())..];
    FILTERED_TAGS.iter().any(|name| {
        let len = name.len();
        rest.len() > len
            && rest[..len].eq_ignore_ascii_case(name.as_bytes())
            && match rest[len] {
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'>' => true,
                b'/' => rest.get(len + 1) == Some(&b'>'),
                _ => false,
            }
    })
}
