// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::DensePrefixSum;
use crate::binary_search::partition_point;
use crate::error::{Error, Result};
use crate::weight::Weight;

/// A lazy cumulative-sum array: `vals[1..=n]` holds raw weights, `cum[1..=n]`
/// holds a running sum, and `dirty_from` marks the oldest slot whose `cum`
/// entry is stale.
///
/// Updates are O(1) (`vals[i] = w`, widen `dirty_from`); `refresh` recomputes
/// `cum` from `dirty_from` onward in one O(n) pass, amortizing to O(1) per
/// update when many updates precede a `choose`. Chosen for buckets with very
/// small `n`, where `SegTree`'s O(log n) update has no real advantage but its
/// constant factor does hurt.
#[derive(Debug, Clone)]
pub struct CumSum<T: Weight> {
    vals: Vec<T>,
    cum: Vec<T>,
    dirty_from: usize,
    cap: usize,
}

impl<T: Weight> CumSum<T> {
    fn refresh(&mut self) {
        if self.dirty_from > self.cap {
            return;
        }

        for j in self.dirty_from..=self.cap {
            self.cum[j] = self.cum[j - 1] + self.vals[j];
        }
        self.dirty_from = self.cap + 1;
    }

    fn check_slot(&self, i: usize) {
        assert!(
            (1..=self.cap).contains(&i),
            "slot {i} out of range 1..={}",
            self.cap
        );
    }
}

impl<T: Weight> DensePrefixSum<T> for CumSum<T> {
    fn with_capacity(capacity_hint: usize) -> Self {
        let cap = capacity_hint.max(1);
        Self {
            vals: vec![T::ZERO; cap + 1],
            cum: vec![T::ZERO; cap + 1],
            dirty_from: cap + 1,
            cap,
        }
    }

    fn capacity(&self) -> usize {
        self.cap
    }

    fn update(&mut self, i: usize, w: T) {
        self.check_slot(i);
        self.vals[i] = w;
        self.dirty_from = self.dirty_from.min(i);
    }

    fn get(&self, i: usize) -> T {
        self.check_slot(i);
        self.vals[i]
    }

    fn total(&mut self) -> T {
        self.refresh();
        self.cum[self.cap]
    }

    fn choose(&mut self, u: T) -> Result<(usize, T)> {
        self.refresh();
        let total = self.cum[self.cap];
        if u < T::ZERO || !(u < total) {
            return Err(Error::OutOfRange);
        }

        // Smallest j with cum[j] > u; cum[1..=cap] is non-decreasing.
        let j = 1 + partition_point(&self.cum[1..=self.cap], |&c| c <= u);
        if j > self.cap {
            return Err(Error::Internal);
        }
        Ok((j, self.vals[j]))
    }

    fn prefix_before(&mut self, i: usize) -> T {
        self.check_slot(i);
        self.refresh();
        self.cum[i - 1]
    }

    fn grow(&mut self, min_capacity: usize) {
        if min_capacity <= self.cap {
            return;
        }

        let mut new_cap = self.cap.max(1);
        while new_cap < min_capacity {
            new_cap *= 2;
        }
        log::debug!("CumSum growing capacity {} -> {new_cap}", self.cap);

        let was_clean = self.dirty_from > self.cap;
        self.vals.resize(new_cap + 1, T::ZERO);
        self.cum.resize(new_cap + 1, T::ZERO);

        if was_clean {
            // New slots are all zero, so cum only needs to be carried
            // forward flat; mark just the new region dirty rather than
            // paying for a full O(new_cap) refresh.
            self.dirty_from = self.cap + 1;
        }
        self.cap = new_cap;
    }
}
