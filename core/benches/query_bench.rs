use criterion::{black_box, criterion_group, criterion_main, Criterion};
use summary_core::{IndexOptions, RetrievalIndex, TopK};

const CONDITIONS: &[&str] = &[
    "Pneumonia", "Diabetes mellitus", "Congestive heart failure", "Hypertension",
    "Acute kidney failure", "Asthma", "Sepsis", "Atrial fibrillation",
];

fn corpus(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            format!(
                "Patient p{i}: gender={}. Diagnosed conditions include: {}, {}.",
                if i % 2 == 0 { "female" } else { "male" },
                CONDITIONS[i % CONDITIONS.len()],
                CONDITIONS[(i * 7 + 3) % CONDITIONS.len()],
            )
        })
        .collect()
}

fn bench_query(c: &mut Criterion) {
    let docs = corpus(1_000);
    c.bench_function("build_1k", |b| b.iter(|| RetrievalIndex::build(docs.iter().cloned(), &IndexOptions::default())));
    let idx = RetrievalIndex::build(docs, &IndexOptions::default());
    c.bench_function("query_1k", |b| b.iter(|| idx.query(black_box("heart failure pneumonia"), TopK::from(3))));
}

criterion_group!(benches, bench_query);
criterion_main!(benches);
