//! Typographic punctuation for `OptionFlags::SMART`.

use std::borrow::Cow;

use crate::inline::{is_punctuation_char, is_unicode_whitespace};

const LEFT_DOUBLE: char = '\u{201C}';
const RIGHT_DOUBLE: char = '\u{201D}';
const LEFT_SINGLE: char = '\u{2018}';
const RIGHT_SINGLE: char = '\u{2019}';
const EN_DASH: char = '\u{2013}';
const EM_DASH: char = '\u{2014}';
const ELLIPSIS: char = '\u{2026}';

/// Rewrites straight quotes, `--`/`---` runs and `...` in one text node.
/// `before` and `after` are the characters around the node, `None` at the
/// edges of the enclosing block.
pub(crate) fn smarten(text: &str, before: Option<char>, after: Option<char>) -> Cow<'_, str> {
    if !text.contains(['"', '\'', '-', '.']) {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let prev = if i == 0 { before } else { Some(chars[i - 1]) };
                let next = chars.get(i + 1).copied().or(after);
                out.push(quote(c, prev, next));
                i += 1;
            }
            '-' => {
                let run = chars[i..].iter().take_while(|&&c| c == '-').count();
                push_dashes(&mut out, run);
                i += run;
            }
            '.' if chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') => {
                out.push(ELLIPSIS);
                i += 3;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Cow::Owned(out)
}

fn quote(c: char, prev: Option<char>, next: Option<char>) -> char {
    let prev = prev.unwrap_or('\n');
    let next = next.unwrap_or('\n');
    let prev_ws = is_unicode_whitespace(prev);
    let next_ws = is_unicode_whitespace(next);
    let prev_punct = is_punctuation_char(prev);
    let next_punct = is_punctuation_char(next);

    let left = !next_ws && (!next_punct || prev_ws || prev_punct);
    let right = !prev_ws && (!prev_punct || next_ws || next_punct);
    let can_open = left && !right && prev != ']' && prev != ')';

    match (c, can_open) {
        ('"', true) => LEFT_DOUBLE,
        ('"', false) if right => RIGHT_DOUBLE,
        ('"', false) => LEFT_DOUBLE,
        (_, true) => LEFT_SINGLE,
        _ => RIGHT_SINGLE,
    }
}

/// Runs divisible by three become em dashes, even runs en dashes; otherwise
/// em dashes followed by one or two en dashes.
fn push_dashes(out: &mut String, run: usize) {
    if run == 1 {
        out.push('-');
        return;
    }
    let (em, en) = if run % 3 == 0 {
        (run / 3, 0)
    } else if run % 2 == 0 {
        (0, run / 2)
    } else if run % 3 == 2 {
        ((run - 2) / 3, 1)
    } else {
        ((run - 4) / 3, 2)
    };
    out.extend(std::iter::repeat_n(EM_DASH, em));
    out.extend(std::iter::repeat_n(EN_DASH, en));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_follow_flanking() {
        assert_eq!(smarten("\"hi\"", None, None), "\u{201C}hi\u{201D}");
        assert_eq!(smarten("'hi'", None, None), "\u{2018}hi\u{2019}");
        assert_eq!(smarten("it's", None, None), "it\u{2019}s");
        assert_eq!(smarten("\"", Some(' '), Some('x')), "\u{201C}");
    }

    #[test]
    fn dash_runs() {
        assert_eq!(smarten("a--b", None, None), "a\u{2013}b");
        assert_eq!(smarten("a---b", None, None), "a\u{2014}b");
        assert_eq!(smarten("-----", None, None), "\u{2014}\u{2013}");
        assert_eq!(smarten("-------", None, None), "\u{2014}\u{2013}\u{2013}");
        assert_eq!(smarten("a-b", None, None), "a-b");
    }

    #[test]
    fn ellipsis() {
        assert_eq!(smarten("wait...", None, None), "wait\u{2026}");
        assert_eq!(smarten("..", None, None), "..");
        assert!(matches!(smarten("plain", None, None), Cow::Borrowed(_)));
    }
}
