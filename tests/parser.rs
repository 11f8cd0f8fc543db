use gfmark::{OptionFlags, Options, markdown_to_html, markdown_to_html_bytes};
use pretty_assertions::assert_eq;

fn assert_html(md: &str, expected: &str) {
    assert_eq!(markdown_to_html(md, &Options::default()).unwrap(), expected);
}

fn assert_html_with(opts: &Options, md: &str, expected: &str) {
    assert_eq!(markdown_to_html(md, opts).unwrap(), expected);
}

fn unsafe_opts() -> Options {
    Options::default().with_flag(OptionFlags::UNSAFE)
}

#[test]
fn parses_empty_and_whitespace_input() {
    assert_html("", "");
    assert_html("   \n\n\t\n", "");
}

#[test]
fn parses_headings_h1_to_h6() {
    assert_html(
        "# h1\n## h2\n### h3\n#### h4\n##### h5\n###### h6",
        "<h1>h1</h1>\n<h2>h2</h2>\n<h3>h3</h3>\n<h4>h4</h4>\n<h5>h5</h5>\n<h6>h6</h6>\n",
    );
    assert_html("####### h7", "<p>####### h7</p>\n");
}

#[test]
fn parses_setext_headings() {
    assert_html(
        "Heading one\n===========\n\nHeading two\n-----------",
        "<h1>Heading one</h1>\n<h2>Heading two</h2>\n",
    );
    assert_html("Foo\nbar\n===", "<h1>Foo\nbar</h1>\n");
}

#[test]
fn parses_indented_heading_and_closing_hashes() {
    assert_html("   ## heading ##", "<h2>heading</h2>\n");
    assert_html("# foo#", "<h1>foo#</h1>\n");
}

#[test]
fn non_heading_without_space_after_hash() {
    assert_html("##heading", "<p>##heading</p>\n");
}

#[test]
fn paragraph_collapses_lines_until_block_boundary() {
    assert_html(
        "line one\nline two\n\n# h\nline three",
        "<p>line one\nline two</p>\n<h1>h</h1>\n<p>line three</p>\n",
    );
}

#[test]
fn parses_inline_styles() {
    assert_html(
        "this is **strong** and *em* and `code`",
        "<p>this is <strong>strong</strong> and <em>em</em> and <code>code</code></p>\n",
    );
}

#[test]
fn parses_underscore_variants() {
    assert_html(
        "__strong__ and _em_",
        "<p><strong>strong</strong> and <em>em</em></p>\n",
    );
    assert_html("foo_bar_", "<p>foo_bar_</p>\n");
}

#[test]
fn parses_nested_inline_markup() {
    assert_html(
        "**outer *inner***",
        "<p><strong>outer <em>inner</em></strong></p>\n",
    );
    assert_html(
        "*foo**bar**baz*",
        "<p><em>foo<strong>bar</strong>baz</em></p>\n",
    );
}

#[test]
fn emphasis_follows_flanking_and_multiple_of_three_rules() {
    assert_html("*a*b*", "<p><em>a</em>b*</p>\n");
    assert_html("**a**", "<p><strong>a</strong></p>\n");
    assert_html("***a***", "<p><em><strong>a</strong></em></p>\n");
    assert_html("*foo**bar**baz*", "<p><em>foo<strong>bar</strong>baz</em></p>\n");
    assert_html("*foo**bar*", "<p><em>foo**bar</em></p>\n");
}

#[test]
fn reference_defined_after_use() {
    assert_html(
        "[foo]\n\n[foo]: /url \"title\"",
        "<p><a href=\"/url\" title=\"title\">foo</a></p>\n",
    );
}

#[test]
fn lazy_line_after_definition_loses_its_indent() {
    assert_html(
        "> [a]: /u\n   bar [a]",
        "<blockquote>\n<p>bar <a href=\"/u\">a</a></p>\n</blockquote>\n",
    );
}

#[test]
fn intraword_star_emphasis() {
    assert_html("foo*bar*", "<p>foo<em>bar</em></p>\n");
}

#[test]
fn parses_links_and_inline_label_markup() {
    assert_html(
        "visit [**site**](https://example.com)",
        "<p>visit <a href=\"https://example.com\"><strong>site</strong></a></p>\n",
    );
}

#[test]
fn parses_reference_style_links_and_shortcuts() {
    assert_html(
        "[A ref][id]\n\n[Shortcut]\n\n[id]: https://example.com \"Ref\"\n[shortcut]: https://shortcut.test",
        "<p><a href=\"https://example.com\" title=\"Ref\">A ref</a></p>\n<p><a href=\"https://shortcut.test\">Shortcut</a></p>\n",
    );
}

#[test]
fn reference_title_on_following_line() {
    assert_html(
        "[foo]: /url\n\"the title\"\n\n[foo]",
        "<p><a href=\"/url\" title=\"the title\">foo</a></p>\n",
    );
}

#[test]
fn parses_reference_style_images() {
    assert_html(
        "![Logo][brand]\n\n[brand]: https://img.test/logo.png \"Logo title\"",
        "<p><img src=\"https://img.test/logo.png\" alt=\"Logo\" title=\"Logo title\" /></p>\n",
    );
}

#[test]
fn link_url_is_html_escaped() {
    assert_html(
        "[x](https://example.com?a=1&b=2)",
        "<p><a href=\"https://example.com?a=1&amp;b=2\">x</a></p>\n",
    );
    assert_html("[a](<b c>)", "<p><a href=\"b%20c\">a</a></p>\n");
}

#[test]
fn unparsable_link_is_left_as_text() {
    assert_html("look [here](missing", "<p>look [here](missing</p>\n");
}

#[test]
fn links_do_not_nest_but_images_do() {
    assert_html(
        "[a [b](c)](d)",
        "<p>[a <a href=\"c\">b</a>](d)</p>\n",
    );
    assert_html(
        "[![a](b)](c)",
        "<p><a href=\"c\"><img src=\"b\" alt=\"a\" /></a></p>\n",
    );
}

#[test]
fn parses_lists() {
    assert_html(
        "- one\n- two\n\n1. first\n2. second",
        "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<ol>\n<li>first</li>\n<li>second</li>\n</ol>\n",
    );
}

#[test]
fn ordered_list_start_number() {
    assert_html(
        "3. a\n4. b",
        "<ol start=\"3\">\n<li>a</li>\n<li>b</li>\n</ol>\n",
    );
}

#[test]
fn loose_lists_wrap_paragraphs() {
    assert_html(
        "- a\n\n- b",
        "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n",
    );
}

#[test]
fn parses_nested_lists() {
    assert_html(
        "- one\n  - two\n    - three",
        "<ul>\n<li>one\n<ul>\n<li>two\n<ul>\n<li>three</li>\n</ul>\n</li>\n</ul>\n</li>\n</ul>\n",
    );
}

#[test]
fn parses_mixed_nested_lists() {
    assert_html(
        "1. one\n  - two\n    1. three",
        "<ol>\n<li>one</li>\n</ol>\n<ul>\n<li>two\n<ol>\n<li>three</li>\n</ol>\n</li>\n</ul>\n",
    );
}

#[test]
fn parses_all_unordered_markers() {
    assert_html(
        "- one\n* two\n+ three",
        "<ul>\n<li>one</li>\n</ul>\n<ul>\n<li>two</li>\n</ul>\n<ul>\n<li>three</li>\n</ul>\n",
    );
}

#[test]
fn ordered_list_requires_digit_dot_space() {
    assert_html("1.one\n1. two", "<p>1.one</p>\n<ol>\n<li>two</li>\n</ol>\n");
}

#[test]
fn parses_blockquotes_and_fences() {
    assert_html(
        "> hello\n> **world**\n\n```rs\nfn main() {}\n```",
        "<blockquote>\n<p>hello\n<strong>world</strong></p>\n</blockquote>\n<pre><code class=\"language-rs\">fn main() {}\n</code></pre>\n",
    );
}

#[test]
fn blockquote_marker_with_optional_space() {
    assert_html(">a\n> b", "<blockquote>\n<p>a\nb</p>\n</blockquote>\n");
}

#[test]
fn lazy_paragraph_continuation() {
    assert_html("> a\nb", "<blockquote>\n<p>a\nb</p>\n</blockquote>\n");
}

#[test]
fn fenced_code_without_language() {
    assert_html("```\n<raw>\n```", "<pre><code>&lt;raw&gt;\n</code></pre>\n");
}

#[test]
fn tilde_fence_with_info_words() {
    assert_html(
        "~~~ python extra\nx\n~~~",
        "<pre><code class=\"language-python\">x\n</code></pre>\n",
    );
}

#[test]
fn fenced_code_without_closing_fence_consumes_rest() {
    assert_html(
        "```txt\nline 1\nline 2",
        "<pre><code class=\"language-txt\">line 1\nline 2\n</code></pre>\n",
    );
}

#[test]
fn parses_indented_code_block() {
    assert_html(
        "    let x = 1;\n\tlet y = 2;\n\nend",
        "<pre><code>let x = 1;\nlet y = 2;\n</code></pre>\n<p>end</p>\n",
    );
}

#[test]
fn code_spans_strip_one_space() {
    assert_html("`` foo ` bar ``", "<p><code>foo ` bar</code></p>\n");
    assert_html("`unclosed", "<p>`unclosed</p>\n");
}

#[test]
fn parses_inline_images_with_title() {
    assert_html(
        "![alt text](https://img.test/logo.png \"Logo\")",
        "<p><img src=\"https://img.test/logo.png\" alt=\"alt text\" title=\"Logo\" /></p>\n",
    );
}

#[test]
fn non_ascii_urls_are_percent_encoded() {
    assert_html("![x](/ä)", "<p><img src=\"/%C3%A4\" alt=\"x\" /></p>\n");
    assert_html("[é](/café?q=ü)", "<p><a href=\"/caf%C3%A9?q=%C3%BC\">é</a></p>\n");
}

#[test]
fn parses_link_title_attribute() {
    assert_html(
        "[Example](https://example.com \"Homepage\")",
        "<p><a href=\"https://example.com\" title=\"Homepage\">Example</a></p>\n",
    );
}

#[test]
fn parses_basic_autolinks() {
    assert_html(
        "<https://example.com> <hello@example.com>",
        "<p><a href=\"https://example.com\">https://example.com</a> <a href=\"mailto:hello@example.com\">hello@example.com</a></p>\n",
    );
}

#[test]
fn backslash_escapes_inline_markers() {
    assert_html("\\*no em\\* and \\[x\\](y)", "<p>*no em* and [x](y)</p>\n");
}

#[test]
fn hard_line_breaks() {
    assert_html("foo  \nbar", "<p>foo<br />\nbar</p>\n");
    assert_html("foo\\\nbar", "<p>foo<br />\nbar</p>\n");
}

#[test]
fn character_references() {
    assert_html(
        "&copy; &#35; &#x22; &nope;",
        "<p>\u{a9} # &quot; &amp;nope;</p>\n",
    );
}

#[test]
fn raw_html_is_omitted_by_default() {
    assert_html(
        "Use <kbd>Ctrl</kbd>",
        "<p>Use <!-- raw HTML omitted -->Ctrl<!-- raw HTML omitted --></p>\n",
    );
    assert_html(
        "![img](data:image/gif;base64,abccdefgh)\n\n<div>hello!</div>\n\n[link](javascript:alert('omg'))",
        "<p><img src=\"data:image/gif;base64,abccdefgh\" alt=\"img\" /></p>\n\
         <!-- raw HTML omitted -->\n\
         <p><a href=\"\">link</a></p>\n",
    );
}

#[test]
fn raw_html_passes_through_in_unsafe_mode() {
    assert_html_with(
        &unsafe_opts(),
        "Use <kbd>Ctrl</kbd> and <em>HTML</em>",
        "<p>Use <kbd>Ctrl</kbd> and <em>HTML</em></p>\n",
    );
    assert_html_with(
        &unsafe_opts(),
        "<script>alert('x')</script> \"quote\"",
        "<script>alert('x')</script> \"quote\"\n",
    );
}

#[test]
fn raw_html_block_is_passed_through() {
    assert_html_with(
        &unsafe_opts(),
        "<dl>\n<dt>Term</dt>\n<dd>Definition</dd>\n</dl>\n\ntext",
        "<dl>\n<dt>Term</dt>\n<dd>Definition</dd>\n</dl>\n<p>text</p>\n",
    );
    assert_html_with(&unsafe_opts(), "<!-- c -->\nx", "<!-- c -->\n<p>x</p>\n");
}

#[test]
fn parses_windows_line_endings() {
    assert_html(
        "# h\r\n\r\n- x\r\n- y\r\n",
        "<h1>h</h1>\n<ul>\n<li>x</li>\n<li>y</li>\n</ul>\n",
    );
}

#[test]
fn extensions_are_off_by_default() {
    assert_html("A | B\n--|--\nx | y", "<p>A | B\n--|--\nx | y</p>\n");
    assert_html("~~deleted~~", "<p>~~deleted~~</p>\n");
    assert_html("https://example.com", "<p>https://example.com</p>\n");
}

#[test]
fn parses_horizontal_rules() {
    assert_html("***\n---\n___", "<hr />\n<hr />\n<hr />\n");
}

#[test]
fn hard_breaks_option_converts_soft_breaks() {
    let opts = Options::default().with_flag(OptionFlags::HARDBREAKS);
    assert_html_with(&opts, "1\n2", "<p>1<br />\n2</p>\n");
    assert_html_with(
        &opts,
        "> 1\n> 2",
        "<blockquote>\n<p>1<br />\n2</p>\n</blockquote>\n",
    );
    assert_html("1\n2", "<p>1\n2</p>\n");
}

#[test]
fn smart_punctuation() {
    let opts = Options::default().with_flag(OptionFlags::SMART);
    assert_html_with(
        &opts,
        "\"Hi\" -- it's... ok---yes",
        "<p>\u{201C}Hi\u{201D} \u{2013} it\u{2019}s\u{2026} ok\u{2014}yes</p>\n",
    );
    assert_html_with(&opts, "`\"code\"`", "<p><code>&quot;code&quot;</code></p>\n");
}

#[test]
fn byte_input_is_decoded_lossily() {
    assert_eq!(
        markdown_to_html_bytes(b"# caf\xe9", &Options::default()).unwrap(),
        "<h1>caf\u{FFFD}</h1>\n"
    );
}
