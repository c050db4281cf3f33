// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Seeded, non-cryptographic hashing for key ordering and bucket selection.
//!
//! Wraps `xxh3`, generalized to accept a caller-supplied seed and any `Hash`
//! key rather than a raw byte slice.

use std::hash::{Hash, Hasher};

/// `s2` derivation used when a caller supplies only one seed for [`crate::sum_trie::SumTrie`].
pub const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// A [`Hasher`] that feeds bytes to `xxh3_64`, seeded.
///
/// `std::hash::Hash::hash` calls `write_*` methods on whatever `Hasher` is
/// given to it; we buffer those bytes and hash them in one shot on `finish`,
/// since `xxh3` is not an incremental streaming hasher in the way `SipHasher`
/// is.
struct SeededXxh3 {
    seed: u64,
    buf: Vec<u8>,
}

impl Hasher for SeededXxh3 {
    fn finish(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64_with_seed(&self.buf, self.seed)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Hashes `key` under `seed`, returning a `u64`.
///
/// Any non-cryptographic hash that admits a seed suffices here.
pub fn hash64<K: Hash>(key: &K, seed: u64) -> u64 {
    let mut hasher = SeededXxh3 {
        seed,
        buf: Vec::new(),
    };
    key.hash(&mut hasher);
    hasher.finish()
}

/// Computes the 128-bit ordinate `ok(k) = (hash(k, s1) << 64) | hash(k, s2)`
/// used by [`crate::treap::Treap`] and [`crate::sum_trie::SumTrie`] to impose
/// a total order on keys independent of `K`'s natural order.
pub fn ordinate<K: Hash>(key: &K, s1: u64, s2: u64) -> u128 {
    let hi = hash64(key, s1) as u128;
    let lo = hash64(key, s2) as u128;
    (hi << 64) | lo
}

/// Derives a second seed from a single seed: `s2 = s1 ^ GOLDEN_GAMMA`.
pub fn derive_second_seed(s1: u64) -> u64 {
    s1 ^ GOLDEN_GAMMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash64_is_deterministic() {
        assert_eq!(hash64(&"alpha", 7), hash64(&"alpha", 7));
    }

    #[test]
    fn hash64_depends_on_seed() {
        assert_ne!(hash64(&"alpha", 7), hash64(&"alpha", 8));
    }

    #[test]
    fn ordinate_is_128_bits_wide_in_practice() {
        let a = ordinate(&1u64, 1, 2);
        let b = ordinate(&2u64, 1, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn derived_second_seed_differs() {
        assert_ne!(derive_second_seed(42), 42);
    }
}
