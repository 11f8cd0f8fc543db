//! HTML output.

use std::borrow::Cow;
use std::fmt::Write;

use tracing::debug_span;

use crate::arena::NodeId;
use crate::buffer::Buffer;
use crate::error::Result;
use crate::html::is_dangerous_url;
use crate::nodes::{ListType, NodeValue};
use crate::options::{OptionFlags, Options};
use crate::smart;
use crate::tree::Document;

/// What an extension's render hook writes through.
pub struct RenderContext<'a> {
    doc: &'a Document,
    options: &'a Options,
    out: &'a mut Buffer,
}

impl<'a> RenderContext<'a> {
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    pub fn value(&self, id: NodeId) -> &'a NodeValue {
        self.doc.value(id)
    }

    pub fn out(&mut self) -> &mut Buffer {
        self.out
    }

    pub fn write_str(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn write_escaped(&mut self, s: &str) {
        self.out.push_escaped(s);
    }

    /// Writes a percent-encoded URL. Outside unsafe mode, dangerous schemes
    /// are written as nothing.
    pub fn write_url(&mut self, url: &str) {
        if self.options.has(OptionFlags::UNSAFE) || !is_dangerous_url(url) {
            self.out.push_url(url);
        }
    }

    /// Newline unless the output is empty or already ends with one.
    pub fn cr(&mut self) {
        self.out.cr();
    }

    /// ` data-sourcepos="..."` when source positions are requested.
    pub fn write_sourcepos(&mut self, id: NodeId) -> Result<()> {
        if self.options.has(OptionFlags::SOURCEPOS) {
            let pos = self.doc.get(id).sourcepos;
            write!(self.out, " data-sourcepos=\"{pos}\"")?;
        }
        Ok(())
    }

    /// Raw HTML as it should appear: a placeholder comment in safe mode,
    /// otherwise run through every enabled extension's filter.
    pub fn raw_html<'s>(&self, html: &'s str) -> Cow<'s, str> {
        if !self.options.has(OptionFlags::UNSAFE) {
            return Cow::Borrowed(RAW_HTML_OMITTED);
        }
        let mut filtered = Cow::Borrowed(html);
        for (_, ext) in self.doc.enabled.iter() {
            filtered = match filtered {
                Cow::Borrowed(s) => ext.filter_html(s),
                Cow::Owned(s) => Cow::Owned(ext.filter_html(&s).into_owned()),
            };
        }
        filtered
    }
}

const RAW_HTML_OMITTED: &str = "<!-- raw HTML omitted -->";

enum Work {
    Enter(NodeId),
    Exit(NodeId),
}

/// Renders a [`Document`] to HTML. Holds no state between calls, so a
/// document renders the same every time.
#[derive(Debug, Clone, Copy)]
pub struct HtmlRenderer<'o> {
    options: &'o Options,
}

impl<'o> HtmlRenderer<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }

    pub fn render(&self, doc: &Document) -> Result<String> {
        let mut out = Buffer::with_capacity(doc.node_count() * 16);
        self.render_into(doc, &mut out)?;
        Ok(out.into_string())
    }

    pub fn render_into(&self, doc: &Document, out: &mut Buffer) -> Result<()> {
        let _span = debug_span!("render", nodes = doc.node_count()).entered();
        let mut ctx = RenderContext {
            doc,
            options: self.options,
            out,
        };
        let mut last_char = None;
        let mut stack = vec![Work::Enter(doc.root())];

        while let Some(work) = stack.pop() {
            match work {
                Work::Enter(id) => {
                    let descend = self.enter(&mut ctx, id, &mut last_char)?;
                    stack.push(Work::Exit(id));
                    if descend {
                        let children: Vec<NodeId> = doc.children(id).collect();
                        stack.extend(children.into_iter().rev().map(Work::Enter));
                    }
                }
                Work::Exit(id) => self.exit(&mut ctx, id)?,
            }
        }
        Ok(())
    }

    /// Writes the opening side of `id`. Returns whether to visit children.
    fn enter(
        &self,
        ctx: &mut RenderContext<'_>,
        id: NodeId,
        last_char: &mut Option<char>,
    ) -> Result<bool> {
        let doc = ctx.doc;
        let value = doc.value(id);
        if value.is_block() {
            *last_char = None;
        }
        match value {
            NodeValue::Document => {}
            NodeValue::BlockQuote => {
                ctx.cr();
                ctx.write_str("<blockquote");
                ctx.write_sourcepos(id)?;
                ctx.write_str(">\n");
            }
            NodeValue::List(list) => {
                ctx.cr();
                match list.list_type {
                    ListType::Bullet => ctx.write_str("<ul"),
                    ListType::Ordered if list.start != 1 => {
                        write!(ctx.out, "<ol start=\"{}\"", list.start)?;
                    }
                    ListType::Ordered => ctx.write_str("<ol"),
                }
                ctx.write_sourcepos(id)?;
                ctx.write_str(">\n");
            }
            NodeValue::Item(_) => {
                ctx.cr();
                ctx.write_str("<li");
                ctx.write_sourcepos(id)?;
                ctx.write_str(">");
            }
            NodeValue::Heading(heading) => {
                ctx.cr();
                write!(ctx.out, "<h{}", heading.level)?;
                ctx.write_sourcepos(id)?;
                ctx.write_str(">");
            }
            NodeValue::CodeBlock(code) => {
                ctx.cr();
                let info = code.info.trim();
                let (lang, meta) = match info.split_once([' ', '\t']) {
                    Some((lang, meta)) => (lang, meta.trim_start()),
                    None => (info, ""),
                };
                let full_info = self.options.has(OptionFlags::FULL_INFO_STRING) && !meta.is_empty();
                ctx.write_str("<pre");
                ctx.write_sourcepos(id)?;
                if lang.is_empty() {
                    ctx.write_str("><code>");
                } else if self.options.has(OptionFlags::GITHUB_PRE_LANG) {
                    ctx.write_str(" lang=\"");
                    ctx.write_escaped(lang);
                    ctx.write_str("\"");
                    if full_info {
                        ctx.write_str(" data-meta=\"");
                        ctx.write_escaped(meta);
                        ctx.write_str("\"");
                    }
                    ctx.write_str("><code>");
                } else {
                    ctx.write_str("><code class=\"language-");
                    ctx.write_escaped(lang);
                    ctx.write_str("\"");
                    if full_info {
                        ctx.write_str(" data-meta=\"");
                        ctx.write_escaped(meta);
                        ctx.write_str("\"");
                    }
                    ctx.write_str(">");
                }
                ctx.write_escaped(&code.literal);
                ctx.write_str("</code></pre>\n");
            }
            NodeValue::HtmlBlock(html) => {
                ctx.cr();
                let literal = ctx.raw_html(&html.literal);
                ctx.write_str(&literal);
                ctx.cr();
            }
            NodeValue::ThematicBreak => {
                ctx.cr();
                ctx.write_str("<hr");
                ctx.write_sourcepos(id)?;
                ctx.write_str(" />\n");
            }
            NodeValue::Paragraph => {
                if !in_tight_list(doc, id) {
                    ctx.cr();
                    ctx.write_str("<p");
                    ctx.write_sourcepos(id)?;
                    ctx.write_str(">");
                }
            }
            NodeValue::Text(text) => {
                if self.options.has(OptionFlags::SMART) {
                    let after = doc.next_sibling(id).and_then(|n| first_char(doc, n));
                    let text = smart::smarten(text, *last_char, after);
                    ctx.write_escaped(&text);
                } else {
                    ctx.write_escaped(text);
                }
                if let Some(c) = text.chars().next_back() {
                    *last_char = Some(c);
                }
            }
            NodeValue::SoftBreak => {
                if self.options.has(OptionFlags::HARDBREAKS) {
                    ctx.write_str("<br />\n");
                } else if self.options.has(OptionFlags::NOBREAKS) {
                    ctx.write_str(" ");
                } else {
                    ctx.write_str("\n");
                }
                *last_char = Some('\n');
            }
            NodeValue::LineBreak => {
                ctx.write_str("<br />\n");
                *last_char = Some('\n');
            }
            NodeValue::Code(code) => {
                ctx.write_str("<code>");
                ctx.write_escaped(code);
                ctx.write_str("</code>");
                *last_char = code.chars().next_back().or(*last_char);
            }
            NodeValue::HtmlInline(html) => {
                let html = ctx.raw_html(html);
                ctx.write_str(&html);
            }
            NodeValue::Emph => ctx.write_str("<em>"),
            NodeValue::Strong => ctx.write_str("<strong>"),
            NodeValue::Link(link) => {
                ctx.write_str("<a href=\"");
                ctx.write_url(&link.url);
                ctx.write_str("\"");
                if !link.title.is_empty() {
                    ctx.write_str(" title=\"");
                    ctx.write_escaped(&link.title);
                    ctx.write_str("\"");
                }
                ctx.write_str(">");
            }
            NodeValue::Image(link) => {
                ctx.write_str("<img src=\"");
                ctx.write_url(&link.url);
                ctx.write_str("\" alt=\"");
                let alt = alt_text(doc, id);
                ctx.write_escaped(&alt);
                ctx.write_str("\"");
                if !link.title.is_empty() {
                    ctx.write_str(" title=\"");
                    ctx.write_escaped(&link.title);
                    ctx.write_str("\"");
                }
                ctx.write_str(" />");
                return Ok(false);
            }
            NodeValue::Extension(node) => {
                if let Some(ext) = doc.enabled.owner_of(node.kind) {
                    ext.render_html(ctx, id, true)?;
                }
            }
        }
        Ok(true)
    }

    fn exit(&self, ctx: &mut RenderContext<'_>, id: NodeId) -> Result<()> {
        let doc = ctx.doc;
        match doc.value(id) {
            NodeValue::BlockQuote => {
                ctx.cr();
                ctx.write_str("</blockquote>\n");
            }
            NodeValue::List(list) => match list.list_type {
                ListType::Bullet => ctx.write_str("</ul>\n"),
                ListType::Ordered => ctx.write_str("</ol>\n"),
            },
            NodeValue::Item(_) => ctx.write_str("</li>\n"),
            NodeValue::Heading(heading) => write!(ctx.out, "</h{}>\n", heading.level)?,
            NodeValue::Paragraph => {
                if !in_tight_list(doc, id) {
                    ctx.write_str("</p>\n");
                }
            }
            NodeValue::Emph => ctx.write_str("</em>"),
            NodeValue::Strong => ctx.write_str("</strong>"),
            NodeValue::Link(_) => ctx.write_str("</a>"),
            NodeValue::Extension(node) => {
                if let Some(ext) = doc.enabled.owner_of(node.kind) {
                    ext.render_html(ctx, id, false)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Renders `doc` with a one-off [`HtmlRenderer`].
pub fn render_html(doc: &Document, options: &Options) -> Result<String> {
    HtmlRenderer::new(options).render(doc)
}

/// Paragraphs directly inside an item of a tight list render without `<p>`.
pub(crate) fn in_tight_list(doc: &Document, paragraph: NodeId) -> bool {
    doc.parent(paragraph)
        .and_then(|item| doc.parent(item))
        .is_some_and(|list| matches!(doc.value(list), NodeValue::List(l) if l.tight))
}

/// Plain text of an image description, as used for `alt`.
fn alt_text(doc: &Document, image: NodeId) -> String {
    let mut alt = String::new();
    for id in doc.descendants(image).skip(1) {
        match doc.value(id) {
            NodeValue::Text(s) | NodeValue::Code(s) | NodeValue::HtmlInline(s) => alt.push_str(s),
            NodeValue::SoftBreak | NodeValue::LineBreak => alt.push(' '),
            _ => {}
        }
    }
    alt
}

/// First character of rendered inline text at or under `id`.
fn first_char(doc: &Document, mut id: NodeId) -> Option<char> {
    loop {
        match doc.value(id) {
            NodeValue::Text(s) | NodeValue::Code(s) => return s.chars().next(),
            NodeValue::SoftBreak | NodeValue::LineBreak => return Some('\n'),
            _ => id = doc.first_child(id)?,
        }
    }
}
