use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gfmark::{Options, Parser, core_registry, markdown_to_html, render_html};

fn gen_heading_doc(n: usize) -> String {
    (1..=n)
        .map(|i| format!("# Heading {i}\n\nSome paragraph text under heading {i}.\n"))
        .collect()
}

fn gen_nested_list(depth: usize) -> String {
    let mut s = String::new();
    for i in 0..depth {
        s.push_str(&"  ".repeat(i));
        s.push_str(&format!("- item {i}\n"));
    }
    s
}

fn gen_table(rows: usize, cols: usize) -> String {
    let mut s = String::new();
    s.push('|');
    for c in 0..cols {
        s.push_str(&format!(" col{c} |"));
    }
    s.push('\n');
    s.push('|');
    for _ in 0..cols {
        s.push_str(" --- |");
    }
    s.push('\n');
    for r in 0..rows {
        s.push('|');
        for c in 0..cols {
            s.push_str(&format!(" r{r}c{c} |"));
        }
        s.push('\n');
    }
    s
}

fn gen_inline_heavy() -> String {
    let mut s = String::new();
    for i in 0..200 {
        s.push_str(&format!(
            "This has **bold**, *italic*, `code`, ~~strike~~, [link](http://x.com/{i}), www.site{i}.org and more.\n\n"
        ));
    }
    s
}

fn gen_code_blocks(n: usize) -> String {
    (0..n)
        .map(|i| format!("```rust\nfn func_{i}() {{\n    println!(\"hello\");\n}}\n```\n\n"))
        .collect()
}

fn gen_footnotes(n: usize) -> String {
    let mut s = String::new();
    for i in 0..n {
        s.push_str(&format!("Claim {i}[^{i}] and again[^{i}].\n\n"));
    }
    for i in 0..n {
        s.push_str(&format!("[^{i}]: Source {i}.\n"));
    }
    s
}

// --- Parser wrappers ---

type ParserFn = fn(&str) -> String;

const PARSERS: &[(&str, ParserFn)] = &[
    ("gfmark", parse_gfmark),
    ("pulldown_cmark", parse_pulldown_cmark),
    ("comrak", parse_comrak),
];

fn parse_gfmark(input: &str) -> String {
    markdown_to_html(input, &Options::gfm()).unwrap_or_default()
}

fn parse_pulldown_cmark(input: &str) -> String {
    let mut opts = pulldown_cmark::Options::empty();
    opts.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    opts.insert(pulldown_cmark::Options::ENABLE_TABLES);
    opts.insert(pulldown_cmark::Options::ENABLE_TASKLISTS);
    opts.insert(pulldown_cmark::Options::ENABLE_FOOTNOTES);
    let parser = pulldown_cmark::Parser::new_ext(input, opts);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn parse_comrak(input: &str) -> String {
    let mut options = comrak::Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.tagfilter = true;
    options.extension.footnotes = true;
    comrak::markdown_to_html(input, &options)
}

// --- Benchmark helper ---

fn bench_group(c: &mut Criterion, group_name: &str, input: &str) {
    let label = format!("{} bytes", input.len());
    let mut group = c.benchmark_group(group_name);
    for &(name, func) in PARSERS {
        group.bench_with_input(BenchmarkId::new(name, &label), input, |b, input| {
            b.iter(|| func(black_box(input)))
        });
    }
    group.finish();
}

// --- Benchmarks ---

fn bench_sizes(c: &mut Criterion) {
    let base = gen_inline_heavy();
    for &size in &[1_000, 10_000, 100_000] {
        let input: String = base.chars().cycle().take(size).collect();
        bench_group(c, &format!("document_size/{size} bytes"), &input);
    }
}

fn bench_block_types(c: &mut Criterion) {
    let cases: Vec<(&str, String)> = vec![
        ("headings", gen_heading_doc(200)),
        ("nested_lists", gen_nested_list(50)),
        ("table", gen_table(100, 10)),
        ("code_blocks", gen_code_blocks(100)),
        ("footnotes", gen_footnotes(100)),
    ];
    for (name, input) in &cases {
        bench_group(c, &format!("block_types/{name}"), input);
    }
}

fn bench_inline(c: &mut Criterion) {
    let input = gen_inline_heavy();
    bench_group(c, "inline_heavy", &input);
}

// Parse once, render many: the split gfmark adds over one-shot conversion.
fn bench_phases(c: &mut Criterion) {
    let input = gen_inline_heavy() + &gen_table(50, 5);
    let opts = Options::gfm();
    let parser = Parser::new(core_registry(), &opts).unwrap();
    let doc = parser.parse(&input).unwrap();

    let mut group = c.benchmark_group("phases");
    group.bench_function("parse", |b| b.iter(|| parser.parse(black_box(&input))));
    group.bench_function("render", |b| b.iter(|| render_html(black_box(&doc), &opts)));
    group.finish();
}

criterion_group!(
    benches,
    bench_sizes,
    bench_block_types,
    bench_inline,
    bench_phases,
);
criterion_main!(benches);
