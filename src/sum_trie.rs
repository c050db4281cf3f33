// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! PATRICIA sum-trie keyed by the bits of a 128-bit hash.
//!
//! Every key maps to a deterministic ordinate `ok(k) = (hash(k, s1) << 64) |
//! hash(k, s2)`. Branch nodes store a critical-bit index (bit 127 = most
//! significant); the left subtree holds every ordinate with a 0 at that bit,
//! the right every ordinate with a 1. Branch `crit` values strictly decrease
//! on any root-to-leaf path, which bounds the height at 128. Leaves carry a
//! small bucket of `(key, weight)` pairs rather than a single entry, because
//! two distinct keys can — rarely — hash to the same 128-bit ordinate.
//!
//! Like [`crate::treap::Treap`], nodes live in a flat arena and freed nodes
//! go onto a free list rather than shrinking the arena.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::hashing;
use crate::keyed::WeightedChoice;
use crate::weight::Weight;

type NodeId = u32;

#[derive(Debug)]
enum NodeKind<K, T: Weight> {
    Branch { crit: u8, left: NodeId, right: NodeId },
    Leaf { ok: u128, items: Vec<(K, T)> },
}

#[derive(Debug)]
struct Node<K, T: Weight> {
    kind: NodeKind<K, T>,
    sum: T,
}

fn bit(ok: u128, idx: u8) -> bool {
    (ok >> idx) & 1 == 1
}

/// Highest bit index (0 = LSB, 127 = MSB) at which `a` and `b` differ.
///
/// Only meaningful when `a != b`.
fn highest_differing_bit(a: u128, b: u128) -> u8 {
    debug_assert_ne!(a, b, "highest_differing_bit called on equal ordinates");
    127 - (a ^ b).leading_zeros() as u8
}

/// A self-contained keyed prefix-sum container backed by a crit-bit trie
/// over 128-bit key ordinates.
///
/// Construct with [`SumTrie::new`] (derives `seed2` as `s1 ^ GOLDEN_GAMMA`)
/// or [`SumTrie::with_seeds`] for explicit control over both.
#[derive(Debug)]
pub struct SumTrie<K, T: Weight> {
    nodes: Vec<Node<K, T>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    key_to_leaf: FxHashMap<K, NodeId>,
    seed1: u64,
    seed2: u64,
    len: usize,
}

impl<K, T> SumTrie<K, T>
where
    K: Hash + Eq + Clone,
    T: Weight,
{
    /// Creates an empty trie with `seed2` derived from `seed1`.
    pub fn new(seed1: u64) -> Self {
        Self::with_seeds(seed1, hashing::derive_second_seed(seed1))
    }

    /// Creates an empty trie with both ordinate seeds given explicitly.
    pub fn with_seeds(seed1: u64, seed2: u64) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            key_to_leaf: FxHashMap::default(),
            seed1,
            seed2,
            len: 0,
        }
    }

    /// Creates an empty trie with arena space reserved for `capacity_hint`
    /// leaves up front.
    pub fn with_capacity(capacity_hint: usize, seed1: u64) -> Self {
        let mut t = Self::new(seed1);
        t.nodes.reserve(capacity_hint);
        t.key_to_leaf.reserve(capacity_hint);
        t
    }

    fn ordinate(&self, k: &K) -> u128 {
        hashing::ordinate(k, self.seed1, self.seed2)
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

    fn branch_fields(&self, id: NodeId) -> Option<(u8, NodeId, NodeId)> {
        match &self.nodes[id as usize].kind {
            NodeKind::Branch { crit, left, right } => Some((*crit, *left, *right)),
            NodeKind::Leaf { .. } => None,
        }
    }

    fn leaf_ok(&self, id: NodeId) -> u128 {
        match &self.nodes[id as usize].kind {
            NodeKind::Leaf { ok, .. } => *ok,
            NodeKind::Branch { .. } => unreachable!("leaf_ok called on a branch node"),
        }
    }

    fn find_nearest_leaf(&self, id: NodeId, ok: u128) -> NodeId {
        match self.branch_fields(id) {
            Some((crit, left, right)) => {
                let next = if bit(ok, crit) { right } else { left };
                self.find_nearest_leaf(next, ok)
            }
            None => id,
        }
    }

    /// Splices a new leaf for `ok`/`new_leaf` into the subtree rooted at
    /// `id`, at the first point (descending) where the existing structure's
    /// critical bit is `<= newbit`. Adds `w` to every ancestor's sum along
    /// the way (these are the ancestors whose `crit > newbit`).
    fn insert_at(&mut self, id: NodeId, ok: u128, newbit: u8, new_leaf: NodeId, w: T) -> NodeId {
        if let Some((crit, left, right)) = self.branch_fields(id) {
            if crit > newbit {
                if bit(ok, crit) {
                    let nr = self.insert_at(right, ok, newbit, new_leaf, w);
                    if let NodeKind::Branch { right: r, .. } = &mut self.nodes[id as usize].kind {
                        *r = nr;
                    }
                    self.nodes[id as usize].sum = self.nodes[left as usize].sum + self.nodes[nr as usize].sum;
                } else {
                    let nl = self.insert_at(left, ok, newbit, new_leaf, w);
                    if let NodeKind::Branch { left: l, .. } = &mut self.nodes[id as usize].kind {
                        *l = nl;
                    }
                    self.nodes[id as usize].sum = self.nodes[nl as usize].sum + self.nodes[right as usize].sum;
                }
                return id;
            }
        }

        // Splice here: `id`'s whole subtree becomes one child of a fresh
        // branch at bit `newbit`, oriented against the new leaf's own bit.
        let existing_sum = self.nodes[id as usize].sum;
        let (left, right) = if bit(ok, newbit) { (id, new_leaf) } else { (new_leaf, id) };
        self.alloc(Node {
            kind: NodeKind::Branch { crit: newbit, left, right },
            sum: existing_sum + w,
        })
    }

    fn set_existing(&mut self, id: NodeId, ok: u128, key: &K, w: T) {
        if let Some((crit, left, right)) = self.branch_fields(id) {
            if bit(ok, crit) {
                self.set_existing(right, ok, key, w);
            } else {
                self.set_existing(left, ok, key, w);
            }
            self.nodes[id as usize].sum = self.nodes[left as usize].sum + self.nodes[right as usize].sum;
            return;
        }

        if let NodeKind::Leaf { items, .. } = &mut self.nodes[id as usize].kind {
            if let Some(slot) = items.iter_mut().find(|(ik, _)| ik == key) {
                slot.1 = w;
            }
        }
        self.resum_leaf(id);
    }

    fn resum_leaf(&mut self, id: NodeId) {
        let sum = match &self.nodes[id as usize].kind {
            NodeKind::Leaf { items, .. } => items.iter().fold(T::ZERO, |acc, (_, w)| acc + *w),
            NodeKind::Branch { .. } => unreachable!("resum_leaf called on a branch node"),
        };
        self.nodes[id as usize].sum = sum;
    }

    fn append_to_leaf(&mut self, id: NodeId, ok: u128, k: K, w: T) {
        if let Some((crit, left, right)) = self.branch_fields(id) {
            if bit(ok, crit) {
                self.append_to_leaf(right, ok, k, w);
            } else {
                self.append_to_leaf(left, ok, k, w);
            }
            self.nodes[id as usize].sum = self.nodes[left as usize].sum + self.nodes[right as usize].sum;
            return;
        }

        if let NodeKind::Leaf { items, .. } = &mut self.nodes[id as usize].kind {
            items.push((k, w));
        }
        self.resum_leaf(id);
    }

    fn erase_existing(&mut self, id: NodeId, ok: u128, key: &K) -> Option<NodeId> {
        if let Some((crit, left, right)) = self.branch_fields(id) {
            if bit(ok, crit) {
                return match self.erase_existing(right, ok, key) {
                    Some(nr) => {
                        if let NodeKind::Branch { right: r, .. } = &mut self.nodes[id as usize].kind {
                            *r = nr;
                        }
                        self.nodes[id as usize].sum = self.nodes[left as usize].sum + self.nodes[nr as usize].sum;
                        Some(id)
                    }
                    None => {
                        self.free.push(id);
                        Some(left)
                    }
                };
            }
            return match self.erase_existing(left, ok, key) {
                Some(nl) => {
                    if let NodeKind::Branch { left: l, .. } = &mut self.nodes[id as usize].kind {
                        *l = nl;
                    }
                    self.nodes[id as usize].sum = self.nodes[nl as usize].sum + self.nodes[right as usize].sum;
                    Some(id)
                }
                None => {
                    self.free.push(id);
                    Some(right)
                }
            };
        }

        let became_empty = if let NodeKind::Leaf { items, .. } = &mut self.nodes[id as usize].kind {
            if let Some(pos) = items.iter().position(|(ik, _)| ik == key) {
                items.swap_remove(pos);
            }
            items.is_empty()
        } else {
            unreachable!("leaf arm matched a non-leaf node")
        };

        if became_empty {
            self.free.push(id);
            None
        } else {
            self.resum_leaf(id);
            Some(id)
        }
    }

    fn choose_node(&self, id: NodeId, mut u: T) -> Result<(K, T)> {
        match &self.nodes[id as usize].kind {
            NodeKind::Leaf { items, .. } => {
                for (k, w) in items {
                    if u < *w {
                        return Ok((k.clone(), *w));
                    }
                    u = u - *w;
                }
                Err(Error::Internal)
            }
            NodeKind::Branch { left, right, .. } => {
                let left_sum = self.nodes[*left as usize].sum;
                if u < left_sum {
                    self.choose_node(*left, u)
                } else {
                    self.choose_node(*right, u - left_sum)
                }
            }
        }
    }

    fn collect_in_order<'a>(&'a self, id: Option<NodeId>, out: &mut Vec<(&'a K, T)>) {
        let Some(id) = id else { return };
        match &self.nodes[id as usize].kind {
            NodeKind::Leaf { items, .. } => out.extend(items.iter().map(|(k, w)| (k, *w))),
            NodeKind::Branch { left, right, .. } => {
                self.collect_in_order(Some(*left), out);
                self.collect_in_order(Some(*right), out);
            }
        }
    }

    /// Height of the deepest root-to-leaf path, for the height-bound test.
    #[cfg(test)]
    fn height(&self) -> usize {
        fn go<K, T: Weight>(nodes: &[Node<K, T>], id: Option<NodeId>) -> usize {
            let Some(id) = id else { return 0 };
            match &nodes[id as usize].kind {
                NodeKind::Leaf { .. } => 1,
                NodeKind::Branch { left, right, .. } => {
                    1 + go(nodes, Some(*left)).max(go(nodes, Some(*right)))
                }
            }
        }
        go(&self.nodes, self.root)
    }

    /// Verifies that branch `crit` strictly decreases on every root-to-leaf
    /// path, for the structural-invariant test.
    #[cfg(test)]
    fn crit_strictly_decreasing(&self) -> bool {
        fn go<K, T: Weight>(nodes: &[Node<K, T>], id: Option<NodeId>, ceiling: Option<u8>) -> bool {
            let Some(id) = id else { return true };
            match &nodes[id as usize].kind {
                NodeKind::Leaf { .. } => true,
                NodeKind::Branch { crit, left, right } => {
                    if let Some(c) = ceiling {
                        if *crit >= c {
                            return false;
                        }
                    }
                    go(nodes, Some(*left), Some(*crit)) && go(nodes, Some(*right), Some(*crit))
                }
            }
        }
        go(&self.nodes, self.root, None)
    }
}

impl<K, T> Default for SumTrie<K, T>
where
    K: Hash + Eq + Clone,
    T: Weight,
{
    fn default() -> Self {
        Self::new(0)
    }
}

impl<K, T> WeightedChoice<K, T> for SumTrie<K, T>
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
        if let Some(&leaf_id) = self.key_to_leaf.get(&k) {
            let ok = self.leaf_ok(leaf_id);
            if let Some(root) = self.root {
                self.set_existing(root, ok, &k, w);
            }
            return;
        }

        let ok = self.ordinate(&k);
        match self.root {
            None => {
                let leaf_id = self.alloc(Node {
                    kind: NodeKind::Leaf { ok, items: vec![(k.clone(), w)] },
                    sum: w,
                });
                self.key_to_leaf.insert(k, leaf_id);
                self.root = Some(leaf_id);
            }
            Some(root_id) => {
                let nearest = self.find_nearest_leaf(root_id, ok);
                let nearest_ok = self.leaf_ok(nearest);
                if nearest_ok == ok {
                    log::trace!("SumTrie ordinate collision, appending to existing leaf bucket");
                    self.key_to_leaf.insert(k.clone(), nearest);
                    self.append_to_leaf(root_id, ok, k, w);
                } else {
                    let newbit = highest_differing_bit(ok, nearest_ok);
                    let new_leaf_id = self.alloc(Node {
                        kind: NodeKind::Leaf { ok, items: vec![(k.clone(), w)] },
                        sum: w,
                    });
                    self.key_to_leaf.insert(k, new_leaf_id);
                    log::trace!("SumTrie splicing new branch at bit {newbit}");
                    self.root = Some(self.insert_at(root_id, ok, newbit, new_leaf_id, w));
                }
            }
        }
        self.len += 1;
    }

    fn get(&self, k: &K) -> Result<T> {
        let &leaf_id = self.key_to_leaf.get(k).ok_or(Error::NotFound)?;
        match &self.nodes[leaf_id as usize].kind {
            NodeKind::Leaf { items, .. } => {
                items.iter().find(|(ik, _)| ik == k).map(|(_, w)| *w).ok_or(Error::NotFound)
            }
            NodeKind::Branch { .. } => Err(Error::Internal),
        }
    }

    fn has(&self, k: &K) -> bool {
        self.key_to_leaf.contains_key(k)
    }

    fn erase(&mut self, k: &K) {
        let Some(leaf_id) = self.key_to_leaf.remove(k) else {
            return;
        };
        let ok = self.leaf_ok(leaf_id);
        let root = self.root.expect("key_to_leaf entry implies a non-empty trie");
        self.root = self.erase_existing(root, ok, k);
        self.len -= 1;
    }

    fn total(&mut self) -> T {
        self.root.map_or(T::ZERO, |id| self.nodes[id as usize].sum)
    }

    fn choose(&mut self, u: T) -> Result<(K, T)>
    where
        K: Clone,
    {
        let total = self.root.map_or(T::ZERO, |id| self.nodes[id as usize].sum);
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
        self.key_to_leaf.clear();
        self.len = 0;
    }

    fn iter(&self) -> Self::Iter<'_> {
        let mut out = Vec::with_capacity(self.len);
        self.collect_in_order(self.root, &mut out);
        out.into_iter()
    }
}
