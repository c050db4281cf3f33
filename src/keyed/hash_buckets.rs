// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::hash::Hash;
use std::marker::PhantomData;

use super::WeightedChoice;
use crate::dense::{DensePrefixSum, SegTree};
use crate::error::{Error, Result};
use crate::hashing;
use crate::weight::Weight;

/// A hashed two-level keyed container: an outer [`SegTree`] over `B` bucket
/// totals (`B` a power of two), each bucket itself a small keyed container
/// (`Inner`, `KeyedRemoval<SegTree<T>>` by default).
///
/// Outer updates are O(log B); expected inner size is `n/B`, so inner
/// updates and `choose` are O(log(n/B)) or better with the default `Inner`.
/// Drift control: `bucket_total` (the mirror array) accumulates
/// incrementally, but the outer `SegTree` leaf is always *overwritten* with
/// that mirror value rather than incremented, so floating-point drift never
/// compounds at the outer level no matter how many inner updates land in a
/// bucket between outer reads.
#[derive(Debug)]
pub struct HashBuckets<Inner, K, T: Weight> {
    outer: SegTree<T>,
    buckets: Vec<Inner>,
    bucket_total: Vec<T>,
    nbuckets: usize,
    seed: u64,
    count: usize,
    _k: PhantomData<K>,
}

impl<Inner, K, T> HashBuckets<Inner, K, T>
where
    Inner: WeightedChoice<K, T> + Default,
    K: Hash + Eq + Clone,
    T: Weight,
{
    /// Creates an empty container with `nbuckets` buckets (must be a
    /// nonzero power of two) hashed under `seed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` if `nbuckets` is zero or not a power of two.
    pub fn new(nbuckets: usize, seed: u64) -> Result<Self> {
        if nbuckets == 0 || !nbuckets.is_power_of_two() {
            return Err(Error::InvalidCapacity);
        }

        let mut buckets = Vec::with_capacity(nbuckets + 1);
        for _ in 0..=nbuckets {
            buckets.push(Inner::default());
        }

        Ok(Self {
            outer: SegTree::with_capacity(nbuckets),
            buckets,
            bucket_total: vec![T::ZERO; nbuckets + 1],
            nbuckets,
            seed,
            count: 0,
            _k: PhantomData,
        })
    }

    /// The bucket index (1-based) that `k` is assigned to. Stable across
    /// `k`'s entire lifetime, since it depends only on `k` and the
    /// container's fixed `seed`/`nbuckets`.
    pub fn bucket_of(&self, k: &K) -> usize {
        ((hashing::hash64(k, self.seed) as usize) & (self.nbuckets - 1)) + 1
    }

    /// Number of buckets.
    pub fn nbuckets(&self) -> usize {
        self.nbuckets
    }
}

impl<Inner, K, T> WeightedChoice<K, T> for HashBuckets<Inner, K, T>
where
    Inner: WeightedChoice<K, T> + Default,
    K: Hash + Eq + Clone,
    T: Weight,
{
    type Iter<'a>
        = Iter<'a, Inner, K, T>
    where
        Self: 'a,
        K: 'a;

    fn set(&mut self, k: K, w: T) {
        let i = self.bucket_of(&k);
        let bucket = &mut self.buckets[i];
        let old = if bucket.has(&k) {
            bucket.get(&k).expect("has just returned true")
        } else {
            self.count += 1;
            T::ZERO
        };

        bucket.set(k, w);
        let delta = w - old;
        if !delta.is_zero() {
            self.bucket_total[i] = self.bucket_total[i] + delta;
            self.outer.update(i, self.bucket_total[i]);
        }
    }

    fn get(&self, k: &K) -> Result<T> {
        self.buckets[self.bucket_of(k)].get(k)
    }

    fn has(&self, k: &K) -> bool {
        self.buckets[self.bucket_of(k)].has(k)
    }

    fn erase(&mut self, k: &K) {
        let i = self.bucket_of(k);
        let bucket = &mut self.buckets[i];
        let Ok(old) = bucket.get(k) else {
            return;
        };

        bucket.erase(k);
        self.count -= 1;
        self.bucket_total[i] = self.bucket_total[i] - old;
        self.outer.update(i, self.bucket_total[i]);
    }

    fn total(&mut self) -> T {
        self.outer.total()
    }

    fn choose(&mut self, u: T) -> Result<(K, T)>
    where
        K: Clone,
    {
        let (i, _) = self.outer.choose(u)?;
        let left = self.outer.prefix_before(i);
        let remaining = u - left;
        self.buckets[i].choose(remaining)
    }

    fn len(&self) -> usize {
        self.count
    }

    fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.bucket_total.iter_mut().for_each(|t| *t = T::ZERO);
        self.outer = SegTree::with_capacity(self.nbuckets);
        self.count = 0;
    }

    fn iter(&self) -> Self::Iter<'_> {
        Iter {
            buckets: &self.buckets,
            bucket_idx: 0,
            current: None,
        }
    }
}

/// Iterator over the live `(key, weight)` pairs of a [`HashBuckets`],
/// chaining each bucket's own iterator in bucket order.
pub struct Iter<'a, Inner, K, T>
where
    Inner: WeightedChoice<K, T> + 'a,
    T: Weight,
    K: 'a,
{
    buckets: &'a [Inner],
    bucket_idx: usize,
    current: Option<Inner::Iter<'a>>,
}

impl<'a, Inner, K, T> Iterator for Iter<'a, Inner, K, T>
where
    Inner: WeightedChoice<K, T>,
    T: Weight,
{
    type Item = (&'a K, T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(it) = self.current.as_mut() {
                if let Some(item) = it.next() {
                    return Some(item);
                }
            }
            self.bucket_idx += 1;
            if self.bucket_idx >= self.buckets.len() {
                return None;
            }
            self.current = Some(self.buckets[self.bucket_idx].iter());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::SegTree;
    use crate::keyed::KeyedRemoval;
    use test_log::test;

    type HB = HashBuckets<KeyedRemoval<SegTree<f64>, &'static str, f64>, &'static str, f64>;

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(HB::new(3, 0).unwrap_err(), Error::InvalidCapacity);
        assert_eq!(HB::new(0, 0).unwrap_err(), Error::InvalidCapacity);
    }

    #[test]
    fn total_tracks_set_and_erase_across_buckets() {
        let mut hb = HB::new(4, 0).unwrap();
        hb.set("a", 10.0);
        hb.set("b", 20.0);
        hb.set("c", 5.0);
        hb.set("d", 15.0);
        assert_eq!(hb.total(), 50.0);

        hb.set("a", 25.0);
        assert_eq!(hb.total(), 65.0);

        hb.erase(&"b");
        assert_eq!(hb.total(), 45.0);
        assert!(!hb.has(&"b"));
    }

    #[test]
    fn bucket_of_is_stable_across_lifetime() {
        let hb = HB::new(8, 42).unwrap();
        let b1 = hb.bucket_of(&"persistent-key");
        let b2 = hb.bucket_of(&"persistent-key");
        assert_eq!(b1, b2);
    }

    #[test]
    fn iter_visits_every_live_key() {
        let mut hb = HB::new(4, 1).unwrap();
        hb.set("a", 1.0);
        hb.set("b", 2.0);
        hb.set("c", 3.0);
        let mut keys: Vec<_> = hb.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
