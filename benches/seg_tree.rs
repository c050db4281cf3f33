use criterion::{criterion_group, criterion_main, Criterion};
use weighted_choice::dense::{DensePrefixSum, SegTree};

fn seg_tree_update(c: &mut Criterion) {
    c.bench_function("seg_tree update", |b| {
        let mut t = SegTree::<f64>::with_capacity(1_000_000);
        for i in 1..=1_000_000 {
            t.update(i, 1.0);
        }

        let mut i = 1usize;
        b.iter(|| {
            t.update(i, 2.0);
            i = (i % 1_000_000) + 1;
        });
    });
}

fn seg_tree_choose(c: &mut Criterion) {
    c.bench_function("seg_tree choose", |b| {
        let mut t = SegTree::<f64>::with_capacity(1_000_000);
        for i in 1..=1_000_000 {
            t.update(i, 1.0);
        }

        let mut u = 0.0;
        b.iter(|| {
            t.choose(u).unwrap();
            u = if u + 1.0 < 1_000_000.0 { u + 1.0 } else { 0.0 };
        });
    });
}

criterion_group!(benches, seg_tree_update, seg_tree_choose);
criterion_main!(benches);
