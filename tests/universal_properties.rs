//! Cross-container checks for the universal properties every §4.1
//! implementor must satisfy (sum invariant, choice correctness, idempotent
//! erase, zero-equals-erase), run once per container kind rather than
//! duplicated inside each module's unit tests.

use weighted_choice::dense::SegTree;
use weighted_choice::keyed::{HashBuckets, KeyedKeep, KeyedRemoval};
use weighted_choice::sum_trie::SumTrie;
use weighted_choice::treap::Treap;
use weighted_choice::WeightedChoice;

fn exercise_universal_properties<C>(mut fresh: impl FnMut() -> C)
where
    C: WeightedChoice<u32, f64>,
{
    // Property 1 + 2: total() matches the exact sum, get() returns the
    // latest set() value.
    let mut c = fresh();
    let entries = [(1u32, 3.0), (2, 5.0), (3, 2.0)];
    for (k, w) in entries {
        c.set(k, w);
    }
    assert_eq!(c.total(), 10.0);
    c.set(2, 9.0);
    assert_eq!(c.get(&2).unwrap(), 9.0);
    assert_eq!(c.total(), 14.0);

    // Property 3: every u in [0, total()) resolves to a live key.
    let total = c.total();
    let mut u = 0.0;
    while u < total {
        let (k, w) = c.choose(u).unwrap();
        assert!(c.has(&k));
        assert_eq!(w, c.get(&k).unwrap());
        u += 0.37;
    }

    // Property 5: idempotent erase.
    c.erase(&1);
    let after_first = c.total();
    c.erase(&1);
    assert_eq!(c.total(), after_first);
    assert!(!c.has(&1));

    // Property 6: set-then-erase restores total().
    let before = c.total();
    c.set(99, 4.5);
    c.erase(&99);
    assert_eq!(c.total(), before);

    // Property 7: zero-weight set is sampling-equivalent to erase.
    let mut a = fresh();
    let mut b = fresh();
    a.set(10, 1.0);
    a.set(11, 0.0);
    a.set(12, 3.0);
    b.set(10, 1.0);
    b.set(12, 3.0);
    assert_eq!(a.total(), b.total());
    assert_eq!(a.choose(0.0).unwrap(), b.choose(0.0).unwrap());
    assert_eq!(a.choose(3.999).unwrap(), b.choose(3.999).unwrap());

    // Property 8: choose(0) lands on a live key whenever total > 0.
    let mut d = fresh();
    d.set(1, 2.0);
    d.set(2, 3.0);
    let (k, _) = d.choose(0.0).unwrap();
    assert!(d.has(&k));
}

#[test]
fn keyed_removal_over_seg_tree() {
    exercise_universal_properties(|| KeyedRemoval::<SegTree<f64>, u32, f64>::with_capacity(8));
}

#[test]
fn keyed_keep_over_seg_tree() {
    exercise_universal_properties(|| KeyedKeep::<SegTree<f64>, u32, f64>::with_capacity(8));
}

#[test]
fn hash_buckets_over_keyed_removal() {
    exercise_universal_properties(|| {
        HashBuckets::<KeyedRemoval<SegTree<f64>, u32, f64>, u32, f64>::new(4, 7).unwrap()
    });
}

#[test]
fn treap() {
    exercise_universal_properties(|| Treap::<u32, f64>::new(123));
}

#[test]
fn sum_trie() {
    exercise_universal_properties(|| SumTrie::<u32, f64>::new(456));
}

#[test]
fn clear_returns_every_container_to_empty() {
    fn check<C: WeightedChoice<u32, f64>>(mut c: C) {
        c.set(1, 1.0);
        c.set(2, 2.0);
        c.clear();
        assert_eq!(c.len(), 0);
        assert!(c.is_empty());
        assert_eq!(c.total(), 0.0);
        assert!(!c.has(&1));
        c.set(1, 5.0);
        assert_eq!(c.total(), 5.0);
    }

    check(KeyedRemoval::<SegTree<f64>, u32, f64>::with_capacity(4));
    check(KeyedKeep::<SegTree<f64>, u32, f64>::with_capacity(4));
    check(Treap::<u32, f64>::new(1));
    check(SumTrie::<u32, f64>::new(2));
}
