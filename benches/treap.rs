use criterion::{criterion_group, criterion_main, Criterion};
use weighted_choice::treap::Treap;
use weighted_choice::WeightedChoice;

fn treap_set_new_key(c: &mut Criterion) {
    c.bench_function("treap set (new key)", |b| {
        let mut t: Treap<u64, f64> = Treap::new(0);
        let mut k = 0u64;

        b.iter(|| {
            t.set(k, 1.0);
            k += 1;
        });
    });
}

fn treap_choose(c: &mut Criterion) {
    c.bench_function("treap choose", |b| {
        let mut t: Treap<u64, f64> = Treap::new(0);
        for k in 0..100_000u64 {
            t.set(k, 1.0);
        }

        let mut u = 0.0;
        b.iter(|| {
            t.choose(u).unwrap();
            u = if u + 1.0 < 100_000.0 { u + 1.0 } else { 0.0 };
        });
    });
}

criterion_group!(benches, treap_set_new_key, treap_choose);
criterion_main!(benches);
