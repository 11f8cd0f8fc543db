use std::fmt;

use crate::html::{encode_url_escaped_into, escape_html_into};

/// Growable output sink used by the renderer and extension render hooks.
///
/// Thin wrapper over `String` (amortized doubling growth) with the escaping
/// transforms HTML output needs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Buffer {
    inner: String,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: String::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.inner.push_str(s);
    }

    #[inline]
    pub fn push(&mut self, c: char) {
        self.inner.push(c);
    }

    /// Appends `s` with `&`, `<`, `>` and `"` entity-escaped.
    #[inline]
    pub fn push_escaped(&mut self, s: &str) {
        escape_html_into(&mut self.inner, s);
    }

    /// Appends a URL for use inside an attribute value.
    #[inline]
    pub fn push_url(&mut self, url: &str) {
        encode_url_escaped_into(&mut self.inner, url);
    }

    /// Starts a new line unless the output is empty or already at one.
    #[inline]
    pub fn cr(&mut self) {
        if !self.inner.is_empty() && !self.inner.ends_with('\n') {
            self.inner.push('\n');
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[inline]
    pub fn last_char(&self) -> Option<char> {
        self.inner.chars().next_back()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.inner.contains(needle)
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn into_string(self) -> String {
        self.inner
    }
}

impl fmt::Write for Buffer {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.push_str(s);
        Ok(())
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<Buffer> for String {
    fn from(buf: Buffer) -> Self {
        buf.inner
    }
}
