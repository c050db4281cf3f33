// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{next_pow2, DensePrefixSum};
use crate::error::{Error, Result};
use crate::weight::Weight;

/// A fixed-capacity array laid out as a complete binary tree in breadth-first
/// order: cell `1` is the root, cells `2i`/`2i+1` are children of `i`, and
/// leaves occupy `[offset, offset+cap)`. `offset` is the smallest power of
/// two `>= cap`. Every internal cell caches the sum of its subtree.
///
/// `update`/`choose`/`prefix_before` are all O(log cap); `total` is O(1).
#[derive(Debug, Clone)]
pub struct SegTree<T: Weight> {
    /// `cap` logical slots; `tree.len() == 2 * offset`, 1-indexed (index 0 unused).
    tree: Vec<T>,
    offset: usize,
    cap: usize,
}

impl<T: Weight> SegTree<T> {
    fn leaf_index(&self, i: usize) -> usize {
        assert!(
            (1..=self.cap).contains(&i),
            "slot {i} out of range 1..={}",
            self.cap
        );
        self.offset + i - 1
    }

    fn rebuild_from_leaves(offset: usize, leaves: &[T]) -> Vec<T> {
        let mut tree = vec![T::ZERO; 2 * offset];
        for (slot0, &w) in leaves.iter().enumerate() {
            tree[offset + slot0] = w;
        }
        for idx in (1..offset).rev() {
            tree[idx] = tree[2 * idx] + tree[2 * idx + 1];
        }
        tree
    }
}

impl<T: Weight> DensePrefixSum<T> for SegTree<T> {
    fn with_capacity(capacity_hint: usize) -> Self {
        let cap = capacity_hint.max(1);
        let offset = next_pow2(cap);
        Self {
            tree: vec![T::ZERO; 2 * offset],
            offset,
            cap,
        }
    }

    fn capacity(&self) -> usize {
        self.cap
    }

    fn update(&mut self, i: usize, w: T) {
        let mut idx = self.leaf_index(i);
        self.tree[idx] = w;
        idx /= 2;
        while idx >= 1 {
            self.tree[idx] = self.tree[2 * idx] + self.tree[2 * idx + 1];
            idx /= 2;
        }
    }

    fn get(&self, i: usize) -> T {
        self.tree[self.leaf_index(i)]
    }

    fn total(&mut self) -> T {
        self.tree.get(1).copied().unwrap_or(T::ZERO)
    }

    fn choose(&mut self, u: T) -> Result<(usize, T)> {
        let total = self.total();
        if u < T::ZERO || !(u < total) {
            return Err(Error::OutOfRange);
        }

        let mut node = 1;
        let mut remaining = u;
        while node < self.offset {
            let left = 2 * node;
            let left_sum = self.tree[left];
            if remaining < left_sum {
                node = left;
            } else {
                remaining = remaining - left_sum;
                node = left + 1;
            }
        }

        let i = node - self.offset + 1;
        if i > self.cap {
            // Only reachable if `total` counted padding slots beyond `cap`,
            // which never holds weight — this would be a broken invariant.
            return Err(Error::Internal);
        }
        Ok((i, self.tree[node]))
    }

    fn prefix_before(&mut self, i: usize) -> T {
        let mut idx = self.leaf_index(i);
        let mut sum = T::ZERO;
        while idx > 1 {
            if idx % 2 == 1 {
                sum = sum + self.tree[idx - 1];
            }
            idx /= 2;
        }
        sum
    }

    fn grow(&mut self, min_capacity: usize) {
        if min_capacity <= self.cap {
            return;
        }

        let mut new_cap = self.cap.max(1);
        while new_cap < min_capacity {
            new_cap *= 2;
        }
        let new_offset = next_pow2(new_cap);

        log::debug!(
            "SegTree growing capacity {} -> {new_cap} (offset {} -> {new_offset})",
            self.cap,
            self.offset
        );

        let leaves: Vec<T> = (0..self.cap)
            .map(|slot0| self.tree[self.offset + slot0])
            .collect();
        self.tree = Self::rebuild_from_leaves(new_offset, &leaves);
        self.offset = new_offset;
        self.cap = new_cap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn total_and_choose_over_four_slots() {
        let mut t = SegTree::<f64>::with_capacity(4);
        t.update(1, 1.0);
        t.update(2, 2.0);
        t.update(3, 5.0);
        t.update(4, 2.0);

        assert_eq!(t.total(), 10.0);
        assert_eq!(t.choose(0.0).unwrap(), (1, 1.0));
        assert_eq!(t.choose(0.999).unwrap(), (1, 1.0));
        assert_eq!(t.choose(1.0).unwrap(), (2, 2.0));
        assert_eq!(t.choose(7.999).unwrap(), (3, 5.0));
        assert_eq!(t.choose(8.0).unwrap(), (4, 2.0));
    }

    #[test]
    fn choose_out_of_range() {
        let mut t = SegTree::<f64>::with_capacity(2);
        t.update(1, 1.0);
        t.update(2, 1.0);
        assert_eq!(t.choose(2.0), Err(Error::OutOfRange));
        assert_eq!(t.choose(-0.5), Err(Error::OutOfRange));
    }

    #[test]
    fn prefix_before_matches_manual_sum() {
        let mut t = SegTree::<f64>::with_capacity(5);
        for (i, w) in [(1, 3.0), (2, 1.0), (3, 4.0), (4, 1.0), (5, 5.0)] {
            t.update(i, w);
        }
        assert_eq!(t.prefix_before(1), 0.0);
        assert_eq!(t.prefix_before(2), 3.0);
        assert_eq!(t.prefix_before(3), 4.0);
        assert_eq!(t.prefix_before(4), 8.0);
        assert_eq!(t.prefix_before(5), 9.0);
    }

    #[test]
    fn grow_preserves_weights() {
        let mut t = SegTree::<f64>::with_capacity(2);
        t.update(1, 2.0);
        t.update(2, 3.0);
        t.grow(5);
        assert_eq!(t.capacity(), 5);
        assert_eq!(t.total(), 5.0);
        t.update(5, 4.0);
        assert_eq!(t.total(), 9.0);
        assert_eq!(t.choose(8.999).unwrap(), (5, 4.0));
    }

    #[test]
    fn zero_weight_never_chosen() {
        let mut t = SegTree::<f64>::with_capacity(3);
        t.update(1, 0.0);
        t.update(2, 5.0);
        t.update(3, 0.0);
        // u spans only the live weight at slot 2.
        assert_eq!(t.choose(0.0).unwrap(), (2, 5.0));
        assert_eq!(t.choose(4.999).unwrap(), (2, 5.0));
    }
}
