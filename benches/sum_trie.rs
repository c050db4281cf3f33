use criterion::{criterion_group, criterion_main, Criterion};
use weighted_choice::sum_trie::SumTrie;
use weighted_choice::WeightedChoice;

fn sum_trie_set_new_key(c: &mut Criterion) {
    c.bench_function("sum_trie set (new key)", |b| {
        let mut t: SumTrie<u64, f64> = SumTrie::new(0);
        let mut k = 0u64;

        b.iter(|| {
            t.set(k, 1.0);
            k += 1;
        });
    });
}

fn sum_trie_choose(c: &mut Criterion) {
    c.bench_function("sum_trie choose", |b| {
        let mut t: SumTrie<u64, f64> = SumTrie::new(0);
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

criterion_group!(benches, sum_trie_set_new_key, sum_trie_choose);
criterion_main!(benches);
