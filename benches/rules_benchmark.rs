//! Benchmarks for the rewriting passes.
//!
//! Run with: cargo bench

use std::path::{Path, PathBuf};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mdprep::rules::glossary::{link_glossary_terms, process_glossary};
use mdprep::rules::macros::expand_macros;
use mdprep::{
    DeploymentStyle, Diagnostics, Document, FunctionMacro, MacroTable, ProcessingContext,
    ProcessingSettings,
};

fn macro_text(tokens: usize) -> String {
    (0..tokens)
        .map(|i| format!("Line {} uses ${{product}} and ${{issue(DOC-{})}}.\n", i, i))
        .collect()
}

fn bench_macros(c: &mut Criterion) {
    let table = MacroTable::new()
        .with_constant("product", "mdprep")
        .with_function(
            "issue",
            FunctionMacro::new(1, |args| Ok(format!("[{0}](https://issues.example.com/{0})", args[0]))),
        );
    let mut group = c.benchmark_group("expand_macros");
    for tokens in [10, 100, 1_000] {
        let text = macro_text(tokens);
        group.bench_with_input(BenchmarkId::from_parameter(tokens), &text, |b, text| {
            b.iter(|| {
                let diagnostics = Diagnostics::new();
                black_box(expand_macros(black_box(text), &table, Path::new("doc.md"), &diagnostics))
            });
        });
    }
    group.finish();
}

fn bench_glossary(c: &mut Criterion) {
    let glossary: String = (0..50)
        .map(|i| format!("## Term {}\nSynonyms: alias {}, other name {}\n\n", i, i, i))
        .collect();
    let entries = process_glossary(&glossary);
    let text: String = (0..200)
        .map(|i| format!("Paragraph mentioning term {} and alias {}.\n", i % 60, i % 70))
        .collect();

    c.bench_function("link_glossary_terms", |b| {
        b.iter(|| black_box(link_glossary_terms(black_box(&text), &entries, "glossary.md")))
    });
}

fn build_context(documents: usize) -> ProcessingContext {
    let settings = ProcessingSettings::new("/docs", "/out")
        .with_version("v1")
        .with_rules(DeploymentStyle::HierarchicalUnique.rules())
        .with_macros(MacroTable::new().with_constant("product", "mdprep"));
    let mut context = ProcessingContext::new(settings);
    context
        .add_document(Document::new("/docs/glossary.md", "## Product\nSynonyms: tool\n"))
        .unwrap();
    for i in 0..documents {
        let path = PathBuf::from(format!("/docs/section {}/page {}.md", i % 10, i));
        let next = format!("../section {}/page {}.md", (i + 1) % 10, (i + 1) % documents);
        let contents = format!(
            "# Page {}\n${{create_table_of_contents}}\n## Intro\nThe ${{product}} tool, see [next](<{}#intro>).\n",
            i, next
        );
        context.add_document(Document::new(path, contents)).unwrap();
    }
    context
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchical_pipeline");
    group.sample_size(20);
    for documents in [10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(documents), &documents, |b, &n| {
            b.iter_with_setup(|| build_context(n), |context| {
                context.run().unwrap();
                black_box(context.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_macros, bench_glossary, bench_pipeline);
criterion_main!(benches);
