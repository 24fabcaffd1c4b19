//! Benchmarks for session-end deduplication.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pageflow::records::{dedup, CollectionMode, IdentitySchema};
use pageflow::testing::sample_page;

fn session_set(pages: u32, per_page: usize) -> Vec<pageflow::records::Record> {
    let mut records = Vec::with_capacity(pages as usize * per_page);
    for page in 1..=pages {
        records.extend(sample_page(CollectionMode::PrimaryItemCollection, page, per_page));
        // Re-listed items from the previous page.
        if page > 1 {
            records.extend(sample_page(CollectionMode::PrimaryItemCollection, page - 1, 2));
        }
    }
    records
}

fn dedup_benchmark(c: &mut Criterion) {
    let schema = IdentitySchema::primary_items();
    let mut group = c.benchmark_group("dedup");

    for pages in [50u32, 500] {
        let records = session_set(pages, 20);
        group.bench_with_input(BenchmarkId::from_parameter(pages), &records, |b, records| {
            b.iter(|| dedup(black_box(records), &schema));
        });
    }
    group.finish();

    let record = sample_page(CollectionMode::PrimaryItemCollection, 1, 1).remove(0);
    c.bench_function("dedup_key_digest", |b| {
        b.iter(|| schema.key(black_box(&record)).digest());
    });
}

criterion_group!(benches, dedup_benchmark);
criterion_main!(benches);
