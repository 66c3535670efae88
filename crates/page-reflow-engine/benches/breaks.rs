use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use page_reflow_engine::{BlockExtent, compute_breaks};
mod common;

fn bench_compute_breaks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_breaks");

    for count in [100, 1_000, 10_000] {
        let extents = BlockExtent::stacked(&common::generate_block_heights(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &extents, |b, extents| {
            b.iter(|| {
                let plan = compute_breaks(std::hint::black_box(extents), 1123.0, 24.0);
                std::hint::black_box(plan);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute_breaks);
criterion_main!(benches);
