use classification_cache::compute_key;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;

fn bench_compute_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_key");
    let metadata: HashMap<String, String> = [
        ("source", "lecture-3.pdf"),
        ("doc_type", "lecture_notes"),
        ("course", "biomeccanica"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for size in [1_024usize, 16 * 1_024, 256 * 1_024] {
        let text = "Il ginocchio è un'articolazione complessa. ".repeat(size / 44 + 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| compute_key(black_box(text), black_box(&metadata)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute_key);
criterion_main!(benches);
