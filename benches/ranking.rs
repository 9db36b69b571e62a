use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use skin_advisor::retrieval::{Candidate, Collection, rank};
use std::hint::black_box;

fn build_candidates(count: usize, dimension: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            let vector: Vec<f32> = (0..dimension)
                .map(|d| ((i * 31 + d * 7) % 97) as f32 / 97.0)
                .collect();
            Candidate {
                item_id: i as i64,
                name: format!("Product {}", i),
                payload: json!({"id": i}),
                vector,
            }
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let dimension = 768;
    let query: Vec<f32> = (0..dimension).map(|d| (d % 13) as f32 / 13.0).collect();
    let candidates = build_candidates(1000, dimension);

    c.bench_function("rank_1000_candidates_top_5", |b| {
        b.iter(|| {
            rank(
                black_box(&query),
                black_box(&candidates),
                Collection::Products,
                5,
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
