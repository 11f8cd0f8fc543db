use gfmark::{
    Error, ExtensionNode, ExtensionPayload, ExtensionRegistry, NodeId, NodeKind, OptionFlags,
    Options, Parser, RenderContext, SyntaxExtension, markdown_to_html, render_html,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn render(md: &str, opts: &Options) -> String {
    markdown_to_html(md, opts).unwrap()
}

#[rstest]
#[case::basic(
    "| foo | bar |\n| --- | --- |\n| baz | bim |",
    "<table>\n<thead>\n<tr>\n<th>foo</th>\n<th>bar</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>baz</td>\n<td>bim</td>\n</tr>\n</tbody>\n</table>\n"
)]
#[case::alignment(
    "| abc | defghi |\n:-: | -----------:\nbar | baz",
    "<table>\n<thead>\n<tr>\n<th align=\"center\">abc</th>\n<th align=\"right\">defghi</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td align=\"center\">bar</td>\n<td align=\"right\">baz</td>\n</tr>\n</tbody>\n</table>\n"
)]
#[case::escaped_pipes(
    "| f\\|oo  |\n| ------ |\n| b `\\|` az |\n| b **\\|** im |",
    "<table>\n<thead>\n<tr>\n<th>f|oo</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>b <code>|</code> az</td>\n</tr>\n<tr>\n<td>b <strong>|</strong> im</td>\n</tr>\n</tbody>\n</table>\n"
)]
#[case::ends_at_blank_line(
    "| abc | def |\n| --- | --- |\n| bar | baz |\n\nbar",
    "<table>\n<thead>\n<tr>\n<th>abc</th>\n<th>def</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>bar</td>\n<td>baz</td>\n</tr>\n</tbody>\n</table>\n<p>bar</p>\n"
)]
#[case::header_width_mismatch(
    "| abc | def |\n| --- |\n| bar |",
    "<p>| abc | def |\n| --- |\n| bar |</p>\n"
)]
#[case::three_headers_two_delimiters(
    "| a | b | c |\n| --- | --- |\n| 1 | 2 | 3 |",
    "<p>| a | b | c |\n| --- | --- |\n| 1 | 2 | 3 |</p>\n"
)]
fn tables(#[case] md: &str, #[case] expected: &str) {
    assert_eq!(render(md, &Options::default().with_extension("table")), expected);
}

#[test]
fn table_style_attributes() {
    let opts = Options::default()
        .with_extension("table")
        .with_flag(OptionFlags::TABLE_PREFER_STYLE_ATTRIBUTES);
    assert_eq!(
        render("| a | b |\n|:--|--:|", &opts),
        "<table>\n<thead>\n<tr>\n<th style=\"text-align: left\">a</th>\n<th style=\"text-align: right\">b</th>\n</tr>\n</thead>\n</table>\n"
    );
}

#[rstest]
#[case::double("~~Hi~~ Hello", "<p><del>Hi</del> Hello</p>\n")]
#[case::single("~one~", "<p><del>one</del></p>\n")]
#[case::nested_emphasis("~~*a*~~", "<p><del><em>a</em></del></p>\n")]
#[case::triple("x ~~~not~~~", "<p>x ~~~not~~~</p>\n")]
#[case::triple_fence_opener("~~~not~~~\n", "<pre><code class=\"language-not~~~\"></code></pre>\n")]
fn strikethrough(#[case] md: &str, #[case] expected: &str) {
    assert_eq!(
        render(md, &Options::default().with_extension("strikethrough")),
        expected
    );
}

#[test]
fn strikethrough_double_tilde_only() {
    let opts = Options::default()
        .with_extension("strikethrough")
        .with_flag(OptionFlags::STRIKETHROUGH_DOUBLE_TILDE);
    assert_eq!(render("~a~ ~~b~~", &opts), "<p>~a~ <del>b</del></p>\n");
}

#[rstest]
#[case::inline(
    "<strong> <title> <style> <em>",
    "<p><strong> &lt;title> &lt;style> <em></p>\n"
)]
#[case::block(
    "<script>\nalert(1)\n</script>",
    "&lt;script>\nalert(1)\n&lt;/script>\n"
)]
#[case::prefix_only("a <textareax> b", "<p>a <textareax> b</p>\n")]
fn tagfilter(#[case] md: &str, #[case] expected: &str) {
    let opts = Options::default()
        .with_extension("tagfilter")
        .with_flag(OptionFlags::UNSAFE);
    assert_eq!(render(md, &opts), expected);
}

#[test]
fn tagfilter_in_safe_mode_still_omits_raw_html() {
    let opts = Options::default().with_extension("tagfilter");
    assert_eq!(
        render("a <title> b", &opts),
        "<p>a <!-- raw HTML omitted --> b</p>\n"
    );
    assert_eq!(render("<script>\nalert(1)\n</script>", &opts), "<!-- raw HTML omitted -->\n");
}

#[rstest]
#[case::unchecked("- [ ] todo", "<ul>\n<li><input type=\"checkbox\" disabled=\"\" /> todo</li>\n</ul>\n")]
#[case::checked_upper(
    "1. [X] done",
    "<ol>\n<li><input type=\"checkbox\" checked=\"\" disabled=\"\" /> done</li>\n</ol>\n"
)]
#[case::not_first_in_paragraph("- a [x] b", "<ul>\n<li>a [x] b</li>\n</ul>\n")]
fn tasklist(#[case] md: &str, #[case] expected: &str) {
    assert_eq!(render(md, &Options::default().with_extension("tasklist")), expected);
}

#[rstest]
#[case::www(
    "see www.example.com.",
    "<p>see <a href=\"http://www.example.com\">www.example.com</a>.</p>\n"
)]
#[case::scheme(
    "(https://example.com/a_b)",
    "<p>(<a href=\"https://example.com/a_b\">https://example.com/a_b</a>)</p>\n"
)]
#[case::email(
    "mail me@example.org now",
    "<p>mail <a href=\"mailto:me@example.org\">me@example.org</a> now</p>\n"
)]
#[case::inside_code("`www.example.com`", "<p><code>www.example.com</code></p>\n")]
#[case::email_with_underscores(
    "a.b-c_d@a.b.",
    "<p><a href=\"mailto:a.b-c_d@a.b\">a.b-c_d@a.b</a>.</p>\n"
)]
#[case::email_inside_link_text("[me@x.org](/u)", "<p><a href=\"/u\">me@x.org</a></p>\n")]
#[case::non_ascii_domain("www.é", "<p><a href=\"http://www.%C3%A9\">www.é</a></p>\n")]
#[case::non_ascii_path(
    "http://www.é/ü",
    "<p><a href=\"http://www.%C3%A9/%C3%BC\">http://www.é/ü</a></p>\n"
)]
fn autolink(#[case] md: &str, #[case] expected: &str) {
    assert_eq!(render(md, &Options::default().with_extension("autolink")), expected);
}

#[test]
fn footnote_flag_enables_the_extension() {
    let by_flag = render(
        "x[^1]\n\n[^1]: y",
        &Options::default().with_flag(OptionFlags::FOOTNOTES),
    );
    let by_name = render(
        "x[^1]\n\n[^1]: y",
        &Options::default().with_extension("footnote"),
    );
    assert_eq!(by_flag, by_name);
    assert!(by_flag.contains("<section class=\"footnotes\">"));
}

#[test]
fn footnote_markup() {
    let md = "Here is some text[^1].\n\n[^1]: And the note";
    assert_eq!(
        render(md, &Options::default().with_flag(OptionFlags::FOOTNOTES)),
        "<p>Here is some text<sup class=\"footnote-ref\"><a href=\"#fn1\" id=\"fnref1\">1</a></sup>.</p>\n\
         <section class=\"footnotes\">\n<ol>\n<li id=\"fn1\">\n\
         <p>And the note <a href=\"#fnref1\" class=\"footnote-backref\">\u{21A9}</a></p>\n\
         </li>\n</ol>\n</section>\n"
    );
}

#[test]
fn footnote_reference_inside_table_cell() {
    let html = render("| a |\n| - |\n| b[^n] |\n\n[^n]: note", &Options::gfm());
    assert!(html.contains(
        "<td>b<sup class=\"footnote-ref\"><a href=\"#fn1\" id=\"fnref1\">1</a></sup></td>"
    ));
    assert!(html.ends_with("</a></p>\n</li>\n</ol>\n</section>\n"));
}

#[test]
fn gfm_document_combines_extensions() {
    let md = "# Tasks\n\n- [x] ~~ship~~ www.example.com\n- [ ] review\n";
    assert_eq!(
        render(md, &Options::gfm()),
        "<h1>Tasks</h1>\n<ul>\n\
         <li><input type=\"checkbox\" checked=\"\" disabled=\"\" /> <del>ship</del> <a href=\"http://www.example.com\">www.example.com</a></li>\n\
         <li><input type=\"checkbox\" disabled=\"\" /> review</li>\n</ul>\n"
    );
}

#[test]
fn unknown_extension_is_an_error() {
    let err = markdown_to_html("x", &Options::default().with_extension("emoji")).unwrap_err();
    assert!(matches!(err, Error::UnknownExtension(name) if name == "emoji"));
}

const HIGHLIGHT: NodeKind = NodeKind("highlight");

/// `==text==` as `<mark>`.
struct Highlight;

impl SyntaxExtension for Highlight {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[HIGHLIGHT]
    }

    fn delimiter_char(&self) -> Option<u8> {
        Some(b'=')
    }

    fn accepts_delimiter_run(&self, len: usize, _options: &Options) -> bool {
        len == 2
    }

    fn match_delimiters(&self, opener: usize, closer: usize) -> Option<(usize, ExtensionNode)> {
        (opener == closer).then(|| (2, ExtensionNode::new(HIGHLIGHT, ExtensionPayload::None)))
    }

    fn render_html(
        &self,
        ctx: &mut RenderContext<'_>,
        _node: NodeId,
        entering: bool,
    ) -> gfmark::Result<()> {
        ctx.write_str(if entering { "<mark>" } else { "</mark>" });
        Ok(())
    }
}

#[test]
fn third_party_extension_joins_the_core_set() {
    let mut registry = ExtensionRegistry::with_core();
    registry.register(Highlight).unwrap();
    let registry = registry.freeze();

    let opts = Options::default()
        .with_extension("highlight")
        .with_extension("strikethrough");
    let parser = Parser::new(&registry, &opts).unwrap();
    let doc = parser.parse("==hi== and ~~bye~~, a == b").unwrap();
    assert_eq!(doc.extensions(), ["strikethrough", "highlight"]);
    assert_eq!(
        render_html(&doc, &opts).unwrap(),
        "<p><mark>hi</mark> and <del>bye</del>, a == b</p>\n"
    );
}

#[test]
fn registering_a_name_twice_fails() {
    let mut registry = ExtensionRegistry::new();
    registry.register(Highlight).unwrap();
    assert!(matches!(
        registry.register(Highlight),
        Err(Error::DuplicateExtension(name)) if name == "highlight"
    ));
}
