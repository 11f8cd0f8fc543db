use bitflags::bitflags;

/// Default ceiling on the number of nodes one parse may allocate.
pub const DEFAULT_MAX_NODES: usize = 4_000_000;

bitflags! {
    /// Parse and render switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OptionFlags: u32 {
        /// Emit `data-sourcepos` attributes on block elements.
        const SOURCEPOS = 1 << 1;
        /// Render soft line breaks as `<br />`.
        const HARDBREAKS = 1 << 2;
        /// Render soft line breaks as a single space.
        const NOBREAKS = 1 << 3;
        /// Pass raw HTML and dangerous URLs through.
        const UNSAFE = 1 << 4;
        /// Typographic quotes and dashes.
        const SMART = 1 << 5;
        /// Shorthand for enabling the `footnote` extension.
        const FOOTNOTES = 1 << 6;
        /// `<pre lang="x">` instead of a `language-x` class.
        const GITHUB_PRE_LANG = 1 << 8;
        /// Accept `< tag>`-style inline HTML.
        const LIBERAL_HTML_TAG = 1 << 9;
        /// Only `~~` runs form strikethrough.
        const STRIKETHROUGH_DOUBLE_TILDE = 1 << 10;
        /// `style="text-align: …"` on table cells instead of `align`.
        const TABLE_PREFER_STYLE_ATTRIBUTES = 1 << 11;
        /// Emit the info string past the first word as `data-meta`.
        const FULL_INFO_STRING = 1 << 12;
    }
}

impl Default for OptionFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Names of the extensions shipped with the crate.
pub const CORE_EXTENSIONS: [&str; 6] = [
    "table",
    "strikethrough",
    "tagfilter",
    "tasklist",
    "autolink",
    "footnote",
];

/// Options for parsing and rendering a document.
///
/// The default is plain CommonMark with every extension off. Use
/// [`Options::gfm`] for the GitHub dialect.
///
/// ```
/// use gfmark::{OptionFlags, Options};
///
/// let opts = Options::default()
///     .with_extension("table")
///     .with_flag(OptionFlags::SMART);
/// assert!(opts.has(OptionFlags::SMART));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub flags: OptionFlags,
    /// Extension names, resolved against a registry when a parser is built.
    pub extensions: Vec<String>,
    /// Arena ceiling for a single parse.
    pub max_nodes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            flags: OptionFlags::empty(),
            extensions: Vec::new(),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl Options {
    /// All six core extensions enabled.
    pub fn gfm() -> Self {
        Self {
            extensions: CORE_EXTENSIONS.iter().map(|s| (*s).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub fn with_flag(mut self, flag: OptionFlags) -> Self {
        self.flags |= flag;
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.extensions.contains(&name) {
            self.extensions.push(name);
        }
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    #[inline]
    pub fn has(&self, flag: OptionFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Requested extension names with duplicates removed, including the one
    /// implied by [`OptionFlags::FOOTNOTES`].
    pub(crate) fn requested_extensions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.extensions.len() + 1);
        for name in &self.extensions {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        if self.has(OptionFlags::FOOTNOTES) && !names.contains(&"footnote") {
            names.push("footnote");
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_plain_commonmark() {
        let opts = Options::default();
        assert!(opts.flags.is_empty());
        assert!(opts.extensions.is_empty());
        assert_eq!(opts.max_nodes, DEFAULT_MAX_NODES);
    }

    #[test]
    fn footnotes_flag_implies_extension() {
        let opts = Options::default()
            .with_extension("table")
            .with_extension("table")
            .with_flag(OptionFlags::FOOTNOTES);
        assert_eq!(opts.requested_extensions(), vec!["table", "footnote"]);
    }

    #[test]
    fn gfm_lists_every_core_extension() {
        assert_eq!(Options::gfm().requested_extensions(), CORE_EXTENSIONS.to_vec());
    }
}
