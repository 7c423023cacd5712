//! Benchmarks for topic extraction.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use quizfig::topic::TopicExtractor;

fn bench_table_hit(c: &mut Criterion) {
    let extractor = TopicExtractor::default();
    c.bench_function("extract_table_hit", |bench| {
        bench.iter(|| {
            black_box(extractor.extract(
                black_box("Glucose-6-phosphate dehydrogenase (G6PD) deficiency"),
                "",
            ))
        })
    });
}

fn bench_keyword_fallback(c: &mut Criterion) {
    let extractor = TopicExtractor::default();
    c.bench_function("extract_keyword_fallback", |bench| {
        bench.iter(|| {
            black_box(extractor.extract(
                black_box("An entirely unconfigured answer string with several tokens"),
                "What is the diagnosis?",
            ))
        })
    });
}

criterion_group!(benches, bench_table_hit, bench_keyword_fallback);
criterion_main!(benches);
