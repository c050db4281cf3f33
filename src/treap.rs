// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Order-statistics treap keyed by 128-bit hashes.
//!
//! A node is ordered two ways at once: BST order on a 128-bit `ok` ordinate
//! (so every live key has a fixed, total, K-independent order) and min-heap
//! order on a random `prio` (so the tree stays balanced in expectation
//! without any rebalancing logic). `ok = (high64(hash(k, seed)) << 64) |
//! counter`, where `counter` is assigned once per key at first insertion —
//! this keeps a key's position stable across `set` updates even though the
//! hash alone could collide.
//!
//! Nodes live in a flat arena (`Vec<Node<K, T>>`); freed nodes are pushed
//! onto a free list and reused by [`KeyedRemoval`](crate::keyed::KeyedRemoval)'s
//! slot-reuse convention, rather than ever shrinking the arena.

use std::hash::Hash;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::hashing;
use crate::keyed::WeightedChoice;
use crate::weight::Weight;

type NodeId = u32;

#[derive(Debug)]
struct Node<K, T: Weight> {
    ok: u128,
    key: K,
    w: T,
    sum: T,
    prio: u64,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// A self-contained keyed prefix-sum container backed by a randomized BST.
///
/// Construct with [`Treap::new`], giving a seed that determines both the
/// key-hash component of `ok` and the sequence of random node priorities —
/// two containers built from the same seed and fed the same operations in
/// the same order produce identical trees.
#[derive(Debug)]
pub struct Treap<K, T: Weight> {
    nodes: Vec<Node<K, T>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    key_to_node: FxHashMap<K, NodeId>,
    rng: Xoshiro256StarStar,
    seed: u64,
    next_counter: u64,
    len: usize,
}

impl<K, T> Treap<K, T>
where
    K: Hash + Eq + Clone,
    T: Weight,
{
    /// Creates an empty treap whose key hashes and node priorities are both
    /// derived deterministically from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            key_to_node: FxHashMap::default(),
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            seed,
            next_counter: 0,
            len: 0,
        }
    }

    /// Creates an empty treap with arena space reserved for `capacity_hint`
    /// nodes up front.
    pub fn with_capacity(capacity_hint: usize, seed: u64) -> Self {
        let mut t = Self::new(seed);
        t.nodes.reserve(capacity_hint);
        t.key_to_node.reserve(capacity_hint);
        t
    }

    fn sum_of(&self, id: Option<NodeId>) -> T {
        id.map_or(T::ZERO, |i| self.nodes[i as usize].sum)
    }

    fn update_sum(&mut self, id: NodeId) {
        let (l, r, w) = {
            let n = &self.nodes[id as usize];
            (n.left, n.right, n.w)
        };
        let sum = self.sum_of(l) + w + self.sum_of(r);
        self.nodes[id as usize].sum = sum;
    }

    fn alloc(&mut self, node: Node<K, T>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id as usize] = node;
            id
        } else {
            let id = self.nodes.len() as NodeId;
            self.nodes.push(node);
            id
        }
    }

    /// Splits `root` into `(left, right)` where `left` holds every node with
    /// `ok < at` and `right` holds the rest.
    fn split(&mut self, root: Option<NodeId>, at: u128) -> (Option<NodeId>, Option<NodeId>) {
        let Some(id) = root else {
            return (None, None);
        };
        if self.nodes[id as usize].ok < at {
            let right_child = self.nodes[id as usize].right;
            let (l, r) = self.split(right_child, at);
            self.nodes[id as usize].right = l;
            self.update_sum(id);
            (Some(id), r)
        } else {
            let left_child = self.nodes[id as usize].left;
            let (l, r) = self.split(left_child, at);
            self.nodes[id as usize].left = r;
            self.update_sum(id);
            (l, Some(id))
        }
    }

    /// Merges two subtrees known to be key-ordered (every `ok` in `left` <
    /// every `ok` in `right`), preserving heap order on `prio`.
    fn merge(&mut self, left: Option<NodeId>, right: Option<NodeId>) -> Option<NodeId> {
        match (left, right) {
            (None, x) | (x, None) => x,
            (Some(l), Some(r)) => {
                if self.nodes[l as usize].prio < self.nodes[r as usize].prio {
                    let lr = self.nodes[l as usize].right;
                    let merged = self.merge(lr, Some(r));
                    self.nodes[l as usize].right = merged;
                    self.update_sum(l);
                    Some(l)
                } else {
                    let rl = self.nodes[r as usize].left;
                    let merged = self.merge(Some(l), rl);
                    self.nodes[r as usize].left = merged;
                    self.update_sum(r);
                    Some(r)
                }
            }
        }
    }

    fn insert_node(&mut self, root: Option<NodeId>, new: NodeId) -> NodeId {
        let Some(id) = root else { return new };

        if self.nodes[new as usize].prio < self.nodes[id as usize].prio {
            let ok = self.nodes[new as usize].ok;
            let (l, r) = self.split(Some(id), ok);
            self.nodes[new as usize].left = l;
            self.nodes[new as usize].right = r;
            self.update_sum(new);
            new
        } else if self.nodes[new as usize].ok < self.nodes[id as usize].ok {
            let left_child = self.nodes[id as usize].left;
            let merged = self.insert_node(left_child, new);
            self.nodes[id as usize].left = Some(merged);
            self.update_sum(id);
            id
        } else {
            let right_child = self.nodes[id as usize].right;
            let merged = self.insert_node(right_child, new);
            self.nodes[id as usize].right = Some(merged);
            self.update_sum(id);
            id
        }
    }

    fn set_weight_by_ok(&mut self, root: NodeId, ok: u128, w: T) {
        let node_ok = self.nodes[root as usize].ok;
        if node_ok == ok {
            self.nodes[root as usize].w = w;
        } else if ok < node_ok {
            let left = self.nodes[root as usize]
                .left
                .expect("ok must be present under root by construction");
            self.set_weight_by_ok(left, ok, w);
        } else {
            let right = self.nodes[root as usize]
                .right
                .expect("ok must be present under root by construction");
            self.set_weight_by_ok(right, ok, w);
        }
        self.update_sum(root);
    }

    fn erase_by_ok(&mut self, root: NodeId, ok: u128) -> Option<NodeId> {
        let node_ok = self.nodes[root as usize].ok;
        if node_ok == ok {
            let l = self.nodes[root as usize].left;
            let r = self.nodes[root as usize].right;
            self.free.push(root);
            self.merge(l, r)
        } else if ok < node_ok {
            let left = self.nodes[root as usize]
                .left
                .expect("ok must be present under root by construction");
            let replaced = self.erase_by_ok(left, ok);
            self.nodes[root as usize].left = replaced;
            self.update_sum(root);
            Some(root)
        } else {
            let right = self.nodes[root as usize]
                .right
                .expect("ok must be present under root by construction");
            let replaced = self.erase_by_ok(right, ok);
            self.nodes[root as usize].right = replaced;
            self.update_sum(root);
            Some(root)
        }
    }

    fn choose_node(&self, id: NodeId, mut u: T) -> Result<(K, T)> {
        let n = &self.nodes[id as usize];
        let left_sum = self.sum_of(n.left);
        if u < left_sum {
            return self.choose_node(n.left.expect("u < left_sum implies a left child"), u);
        }
        u = u - left_sum;
        if u < n.w {
            return Ok((n.key.clone(), n.w));
        }
        u = u - n.w;
        match n.right {
            Some(r) => self.choose_node(r, u),
            None => Err(Error::Internal),
        }
    }

    fn in_order(&self, id: Option<NodeId>, out: &mut Vec<(&K, T)>) {
        let Some(id) = id else { return };
        let n = &self.nodes[id as usize];
        self.in_order(n.left, out);
        out.push((&n.key, n.w));
        self.in_order(n.right, out);
    }
}

impl<K, T> Default for Treap<K, T>
where
    K: Hash + Eq + Clone,
    T: Weight,
{
    fn default() -> Self {
        Self::new(0)
    }
}

impl<K, T> WeightedChoice<K, T> for Treap<K, T>
where
    K: Hash + Eq + Clone,
    T: Weight,
{
    type Iter<'a>
        = std::vec::IntoIter<(&'a K, T)>
    where
        Self: 'a,
        K: 'a;

    fn set(&mut self, k: K, w: T) {
        if let Some(&id) = self.key_to_node.get(&k) {
            let ok = self.nodes[id as usize].ok;
            let root = self.root.expect("key_to_node entry implies a non-empty tree");
            self.set_weight_by_ok(root, ok, w);
            return;
        }

        let high = hashing::hash64(&k, self.seed) as u128;
        let counter = self.next_counter;
        self.next_counter += 1;
        let ok = (high << 64) | u128::from(counter);
        let prio: u64 = self.rng.random();

        let id = self.alloc(Node {
            ok,
            key: k.clone(),
            w,
            sum: w,
            prio,
            left: None,
            right: None,
        });
        self.key_to_node.insert(k, id);
        self.root = Some(self.insert_node(self.root, id));
        self.len += 1;
    }

    fn get(&self, k: &K) -> Result<T> {
        let &id = self.key_to_node.get(k).ok_or(Error::NotFound)?;
        Ok(self.nodes[id as usize].w)
    }

    fn has(&self, k: &K) -> bool {
        self.key_to_node.contains_key(k)
    }

    fn erase(&mut self, k: &K) {
        let Some(id) = self.key_to_node.remove(k) else {
            return;
        };
        let ok = self.nodes[id as usize].ok;
        let root = self.root.expect("key_to_node entry implies a non-empty tree");
        self.root = self.erase_by_ok(root, ok);
        self.len -= 1;
    }

    fn total(&mut self) -> T {
        self.sum_of(self.root)
    }

    fn choose(&mut self, u: T) -> Result<(K, T)>
    where
        K: Clone,
    {
        let total = self.sum_of(self.root);
        if u < T::ZERO || !(u < total) {
            return Err(Error::OutOfRange);
        }
        let root = self.root.ok_or(Error::Internal)?;
        self.choose_node(root, u)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.key_to_node.clear();
        self.next_counter = 0;
        self.len = 0;
    }

    fn iter(&self) -> Self::Iter<'_> {
        let mut out = Vec::with_capacity(self.len);
        self.in_order(self.root, &mut out);
        out.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn total_and_choose_after_deleting_a_middle_key() {
        let mut t: Treap<&'static str, f64> = Treap::new(7);
        t.set("a", 1.0);
        t.set("b", 2.0);
        t.set("c", 3.0);
        t.set("d", 4.0);
        assert_eq!(t.total(), 10.0);

        t.erase(&"b");
        assert_eq!(t.total(), 8.0);
        assert!(!t.has(&"b"));

        let (_, w) = t.choose(0.0).unwrap();
        assert_eq!(w, {
            let mut xs: Vec<_> = t.iter().collect();
            xs.sort_by(|a, b| a.0.cmp(b.0));
            xs.first().unwrap().1
        });
        assert!(t.choose(7.999).is_ok());
    }

    #[test]
    fn get_returns_most_recent_set() {
        let mut t: Treap<u32, f64> = Treap::new(1);
        t.set(1, 5.0);
        t.set(1, 9.0);
        assert_eq!(t.get(&1).unwrap(), 9.0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn idempotent_erase() {
        let mut t: Treap<u32, f64> = Treap::new(2);
        t.set(1, 5.0);
        t.erase(&1);
        t.erase(&1);
        assert_eq!(t.total(), 0.0);
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn zero_weight_equals_erase_for_choose() {
        let mut a: Treap<&'static str, f64> = Treap::new(3);
        a.set("x", 1.0);
        a.set("y", 0.0);
        a.set("z", 3.0);

        let mut b: Treap<&'static str, f64> = Treap::new(3);
        b.set("x", 1.0);
        b.set("z", 3.0);

        assert_eq!(a.total(), b.total());
    }

    #[test]
    fn churn_keeps_sum_and_len_consistent() {
        let mut t: Treap<u32, f64> = Treap::new(99);
        for k in 0..500u32 {
            t.set(k, f64::from(k % 7));
        }
        for k in (0..500u32).step_by(2) {
            t.erase(&k);
        }
        assert_eq!(t.len(), 250);
        let expected: f64 = (1..500u32)
            .step_by(2)
            .map(|k| f64::from(k % 7))
            .sum();
        assert!((t.total() - expected).abs() < 1e-9);
    }

    #[test]
    fn iter_visits_every_live_key_in_ok_order() {
        let mut t: Treap<u32, f64> = Treap::new(5);
        t.set(10, 1.0);
        t.set(20, 2.0);
        t.set(30, 3.0);
        let keys: std::collections::HashSet<_> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, [10, 20, 30].into_iter().collect());
    }
}
