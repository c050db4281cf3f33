// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::WeightedChoice;
use crate::error::{Error, Result};
use crate::weight::Weight;

/// A plain parallel-arrays keyed container: `entries` holds `(key, weight)`
/// pairs in insertion order and `choose` linear-scans them.
///
/// This exists as the alternative `Inner` for [`super::HashBuckets`]: when
/// buckets are known to stay tiny (a handful of keys), a linear scan beats a
/// `SegTree`'s pointer-chasing and index arithmetic. It still satisfies the
/// [`WeightedChoice`] contract, just at O(n) rather than O(log n).
#[derive(Debug, Default)]
pub struct SmallVecBucket<K, T: Weight> {
    entries: Vec<(K, T)>,
    total: T,
}

impl<K, T> SmallVecBucket<K, T>
where
    K: Eq + Clone,
    T: Weight,
{
    /// `capacity_hint` is a plain `Vec` capacity reservation; this container
    /// has no fixed upper bound.
    pub fn with_capacity(capacity_hint: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity_hint),
            total: T::ZERO,
        }
    }

    fn position(&self, k: &K) -> Option<usize> {
        self.entries.iter().position(|(ek, _)| ek == k)
    }
}

impl<K, T> WeightedChoice<K, T> for SmallVecBucket<K, T>
where
    K: Eq + Clone,
    T: Weight,
{
    type Iter<'a>
        = Iter<'a, K, T>
    where
        Self: 'a,
        K: 'a;

    fn set(&mut self, k: K, w: T) {
        if let Some(idx) = self.position(&k) {
            let old = self.entries[idx].1;
            self.entries[idx].1 = w;
            self.total = self.total - old + w;
        } else {
            self.entries.push((k, w));
            self.total = self.total + w;
        }
    }

    fn get(&self, k: &K) -> Result<T> {
        self.position(k)
            .map(|idx| self.entries[idx].1)
            .ok_or(Error::NotFound)
    }

    fn has(&self, k: &K) -> bool {
        self.position(k).is_some()
    }

    fn erase(&mut self, k: &K) {
        if let Some(idx) = self.position(k) {
            let (_, w) = self.entries.swap_remove(idx);
            self.total = self.total - w;
        }
    }

    fn total(&mut self) -> T {
        self.total
    }

    fn choose(&mut self, u: T) -> Result<(K, T)>
    where
        K: Clone,
    {
        if u < T::ZERO || !(u < self.total) {
            return Err(Error::OutOfRange);
        }

        let mut seen = T::ZERO;
        for (k, w) in &self.entries {
            let next = seen + *w;
            if u < next {
                return Ok((k.clone(), *w));
            }
            seen = next;
        }
        Err(Error::Internal)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.total = T::ZERO;
    }

    fn iter(&self) -> Self::Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

/// Iterator over the live `(key, weight)` pairs of a [`SmallVecBucket`].
pub struct Iter<'a, K, T> {
    inner: std::slice::Iter<'a, (K, T)>,
}

impl<'a, K, T: Weight> Iterator for Iter<'a, K, T> {
    type Item = (&'a K, T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, w)| (k, *w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn linear_scan_choose_matches_prefix_order() {
        let mut b: SmallVecBucket<&str, f64> = SmallVecBucket::with_capacity(4);
        b.set("a", 1.0);
        b.set("b", 2.0);
        b.set("c", 5.0);
        assert_eq!(b.total(), 8.0);
        assert_eq!(b.choose(0.0).unwrap(), ("a", 1.0));
        assert_eq!(b.choose(0.999).unwrap(), ("a", 1.0));
        assert_eq!(b.choose(1.0).unwrap(), ("b", 2.0));
        assert_eq!(b.choose(7.999).unwrap(), ("c", 5.0));
        assert_eq!(b.choose(8.0), Err(Error::OutOfRange));
    }

    #[test]
    fn erase_uses_swap_remove_but_total_stays_correct() {
        let mut b: SmallVecBucket<&str, f64> = SmallVecBucket::with_capacity(4);
        b.set("a", 1.0);
        b.set("b", 2.0);
        b.set("c", 3.0);
        b.erase(&"a");
        assert!(!b.has(&"a"));
        assert_eq!(b.total(), 5.0);
        assert_eq!(b.len(), 2);
    }
}
