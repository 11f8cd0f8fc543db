//! The parse driver: block phase, extension passes, inline phase.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::block::BlockParser;
use crate::error::Result;
use crate::extension::{Enabled, FrozenRegistry, TreeMut};
use crate::inline::parse_document_inlines;
use crate::options::Options;
use crate::tree::Document;

/// A configured parser. Cheap to share: the extension set is resolved once
/// and each [`Parser::parse`] call builds its own arena.
pub struct Parser {
    enabled: Arc<Enabled>,
    options: Options,
    pending: Vec<u8>,
}

impl Parser {
    /// Resolves the requested extensions against `registry`. Unknown names
    /// fail here, before any input is seen.
    pub fn new(registry: &Arc<FrozenRegistry>, options: &Options) -> Result<Self> {
        let enabled = Enabled::resolve(registry, options)?;
        debug!(extensions = ?enabled.names(), "parser configured");
        Ok(Self {
            enabled: Arc::new(enabled),
            options: options.clone(),
            pending: Vec::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn parse(&self, input: &str) -> Result<Document> {
        let _span = debug_span!("parse", len = input.len()).entered();
        let input = replace_nul(input);
        let options = &self.options;
        let enabled = &*self.enabled;

        let mut blocks = BlockParser::new(options, enabled)?.parse(&input)?;

        for (_, ext) in enabled.iter() {
            let mut tree = TreeMut {
                arena: &mut blocks.arena,
                root: blocks.root,
                footnotes: &mut blocks.footnotes,
                options,
            };
            ext.postprocess_blocks(&mut tree)?;
        }

        parse_document_inlines(
            &mut blocks.arena,
            blocks.root,
            &blocks.refs,
            &mut blocks.footnotes,
            options,
            enabled,
        )?;

        for (_, ext) in enabled.iter() {
            let mut tree = TreeMut {
                arena: &mut blocks.arena,
                root: blocks.root,
                footnotes: &mut blocks.footnotes,
                options,
            };
            ext.post_process(&mut tree)?;
        }
        debug!(nodes = blocks.arena.len(), "parse complete");

        Ok(Document {
            arena: blocks.arena,
            root: blocks.root,
            refs: blocks.refs,
            footnotes: blocks.footnotes,
            enabled: Arc::clone(&self.enabled),
        })
    }

    /// Parses raw bytes. Invalid UTF-8 sequences become U+FFFD.
    pub fn parse_bytes(&self, input: &[u8]) -> Result<Document> {
        self.parse(&String::from_utf8_lossy(input))
    }

    /// Buffers a chunk of input for [`Parser::finish`].
    pub fn feed(&mut self, chunk: &str) {
        self.pending.extend_from_slice(chunk.as_bytes());
    }

    /// Buffers raw bytes. A character may be split across chunks; decoding
    /// waits for [`Parser::finish`].
    pub fn feed_bytes(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Parses everything fed so far.
    pub fn finish(self) -> Result<Document> {
        self.parse_bytes(&self.pending)
    }
}

fn replace_nul(input: &str) -> Cow<'_, str> {
    if memchr::memchr(0, input.as_bytes()).is_some() {
        Cow::Owned(input.replace('\0', "\u{FFFD}"))
    } else {
        Cow::Borrowed(input)
    }
}
