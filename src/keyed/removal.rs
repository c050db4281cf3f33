// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use rustc_hash::FxHashMap;
use std::hash::Hash;

use super::WeightedChoice;
use crate::dense::DensePrefixSum;
use crate::error::{Error, Result};
use crate::weight::Weight;

/// Wraps any [`DensePrefixSum`] to turn it into a keyed container that
/// reuses vacated slots.
///
/// For every live `k`, slot `slot_of[k]` holds weight `w_k`; every slot not
/// in `slot_of` is either beyond the high-water mark or sitting on the free
/// stack holding weight `0`. Because zero-weight slots never contribute to
/// `choose`, slot churn under balanced insert/erase traffic stays bounded —
/// the free stack is reused before the high-water mark advances.
#[derive(Debug)]
pub struct KeyedRemoval<D, K, T: Weight> {
    inner: D,
    slot_of: FxHashMap<K, usize>,
    key_of: Vec<Option<K>>,
    free: Vec<usize>,
    high_water: usize,
    _t: std::marker::PhantomData<T>,
}

impl<D, K, T> KeyedRemoval<D, K, T>
where
    D: DensePrefixSum<T>,
    K: Eq + Hash + Clone,
    T: Weight,
{
    /// Creates an empty container with room for at least `capacity_hint`
    /// keys before the underlying dense structure needs to grow.
    pub fn with_capacity(capacity_hint: usize) -> Self {
        let inner = D::with_capacity(capacity_hint.max(1));
        let key_of = vec![None; inner.capacity() + 1];
        Self {
            inner,
            slot_of: FxHashMap::default(),
            key_of,
            free: Vec::new(),
            high_water: 0,
            _t: std::marker::PhantomData,
        }
    }

    /// Current capacity of the underlying dense structure.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl<D, K, T> Default for KeyedRemoval<D, K, T>
where
    D: DensePrefixSum<T>,
    K: Eq + Hash + Clone,
    T: Weight,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<D, K, T> KeyedRemoval<D, K, T>
where
    D: DensePrefixSum<T>,
    K: Eq + Hash + Clone,
    T: Weight,
{
    fn allocate_slot(&mut self) -> usize {
        if let Some(i) = self.free.pop() {
            return i;
        }

        self.high_water += 1;
        if self.high_water > self.inner.capacity() {
            log::trace!(
                "KeyedRemoval exhausted free list at {} live keys, growing",
                self.high_water
            );
            self.inner.grow(self.high_water);
        }
        if self.key_of.len() <= self.inner.capacity() {
            self.key_of.resize(self.inner.capacity() + 1, None);
        }
        self.high_water
    }
}

impl<D, K, T> WeightedChoice<K, T> for KeyedRemoval<D, K, T>
where
    D: DensePrefixSum<T>,
    K: Eq + Hash + Clone,
    T: Weight,
{
    type Iter<'a>
        = Iter<'a, K, T, D>
    where
        Self: 'a,
        K: 'a;

    fn set(&mut self, k: K, w: T) {
        if let Some(&i) = self.slot_of.get(&k) {
            self.inner.update(i, w);
            return;
        }

        let i = self.allocate_slot();
        self.slot_of.insert(k.clone(), i);
        self.key_of[i] = Some(k);
        self.inner.update(i, w);
    }

    fn get(&self, k: &K) -> Result<T> {
        let &i = self.slot_of.get(k).ok_or(Error::NotFound)?;
        Ok(self.inner.get(i))
    }

    fn has(&self, k: &K) -> bool {
        self.slot_of.contains_key(k)
    }

    fn erase(&mut self, k: &K) {
        let Some(i) = self.slot_of.remove(k) else {
            return;
        };
        self.inner.update(i, T::ZERO);
        self.key_of[i] = None;
        self.free.push(i);
    }

    fn total(&mut self) -> T {
        self.inner.total()
    }

    fn choose(&mut self, u: T) -> Result<(K, T)>
    where
        K: Clone,
    {
        let (i, w) = self.inner.choose(u)?;
        let k = self.key_of.get(i).and_then(|o| o.clone()).ok_or(Error::Internal)?;
        Ok((k, w))
    }

    fn len(&self) -> usize {
        self.slot_of.len()
    }

    fn clear(&mut self) {
        self.slot_of.clear();
        self.free.clear();
        self.high_water = 0;
        self.inner = D::with_capacity(self.inner.capacity());
        self.key_of = vec![None; self.inner.capacity() + 1];
    }

    fn iter(&self) -> Self::Iter<'_> {
        Iter::new(self.key_of.iter(), &self.inner)
    }
}

/// Iterator over the live `(key, weight)` pairs of a [`KeyedRemoval`].
pub struct Iter<'a, K, T: Weight, D> {
    slots: std::slice::Iter<'a, Option<K>>,
    inner: &'a D,
    next_slot: usize,
    _t: std::marker::PhantomData<T>,
}

impl<'a, K, T: Weight, D> Iter<'a, K, T, D> {
    pub(crate) fn new(slots: std::slice::Iter<'a, Option<K>>, inner: &'a D) -> Self {
        Self {
            slots,
            inner,
            next_slot: 0,
            _t: std::marker::PhantomData,
        }
    }
}

impl<'a, K, T, D> Iterator for Iter<'a, K, T, D>
where
    D: DensePrefixSum<T>,
    T: Weight,
{
    type Item = (&'a K, T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slot = self.slots.next()?;
            let i = self.next_slot;
            self.next_slot += 1;
            if let Some(k) = slot {
                return Some((k, self.inner.get(i)));
            }
        }
    }
}
