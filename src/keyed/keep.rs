// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use rustc_hash::FxHashMap;
use std::hash::Hash;

use super::WeightedChoice;
use crate::dense::DensePrefixSum;
use crate::error::{Error, Result};
use crate::weight::Weight;

/// Wraps any [`DensePrefixSum`] to turn it into a keyed container that never
/// frees a slot once assigned: `erase(k)` zeroes the slot but `k`'s mapping
/// (and the slot itself) stays reserved. Use this over [`super::KeyedRemoval`]
/// when the same keys come and go repeatedly, so their slot assignment (and
/// the tree-depth locality that comes with it) doesn't churn.
#[derive(Debug)]
pub struct KeyedKeep<D, K, T: Weight> {
    inner: D,
    slot_of: FxHashMap<K, usize>,
    key_of: Vec<Option<K>>,
    next_slot: usize,
    _t: std::marker::PhantomData<T>,
}

impl<D, K, T> KeyedKeep<D, K, T>
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
            next_slot: 0,
            _t: std::marker::PhantomData,
        }
    }

    /// Current capacity of the underlying dense structure.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl<D, K, T> Default for KeyedKeep<D, K, T>
where
    D: DensePrefixSum<T>,
    K: Eq + Hash + Clone,
    T: Weight,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<D, K, T> WeightedChoice<K, T> for KeyedKeep<D, K, T>
where
    D: DensePrefixSum<T>,
    K: Eq + Hash + Clone,
    T: Weight,
{
    type Iter<'a>
        = super::removal::Iter<'a, K, T, D>
    where
        Self: 'a,
        K: 'a;

    fn set(&mut self, k: K, w: T) {
        if let Some(&i) = self.slot_of.get(&k) {
            self.inner.update(i, w);
            return;
        }

        self.next_slot += 1;
        if self.next_slot > self.inner.capacity() {
            log::trace!("KeyedKeep growing to fit slot {}", self.next_slot);
            self.inner.grow(self.next_slot);
        }
        if self.key_of.len() <= self.inner.capacity() {
            self.key_of.resize(self.inner.capacity() + 1, None);
        }

        let i = self.next_slot;
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
        let Some(&i) = self.slot_of.get(k) else {
            return;
        };
        self.inner.update(i, T::ZERO);
        self.slot_of.remove(k);
        self.key_of[i] = None;
        // NOTE: the slot index itself stays reserved, unlike KeyedRemoval —
        // this is the entire point of this variant. Clearing key_of[i] keeps
        // iter() in sync with len() and avoids emitting a stale key twice
        // when it's later re-inserted into a fresh slot.
    }

    fn total(&mut self) -> T {
        self.inner.total()
    }

    fn choose(&mut self, u: T) -> Result<(K, T)>
    where
        K: Clone,
    {
        let (i, w) = self.inner.choose(u)?;
        let k = self
            .key_of
            .get(i)
            .and_then(|o| o.clone())
            .ok_or(Error::Internal)?;
        Ok((k, w))
    }

    fn len(&self) -> usize {
        self.slot_of.len()
    }

    fn clear(&mut self) {
        self.slot_of.clear();
        self.next_slot = 0;
        self.inner = D::with_capacity(self.inner.capacity());
        self.key_of = vec![None; self.inner.capacity() + 1];
    }

    fn iter(&self) -> Self::Iter<'_> {
        super::removal::Iter::new(self.key_of.iter(), &self.inner)
    }
}
