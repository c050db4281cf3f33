// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The one piece of the Gillespie sampler layer kept in-tree: drawing a
//! key from a container with probability proportional to its weight.
//!
//! Everything else that consumes the [`WeightedChoice`] contract — direct-call,
//! first-to-fire, first-reaction, combined-next-reaction, and
//! composition-rejection dispatch — is an external collaborator and stays
//! out of this crate.

use rand::distr::uniform::SampleUniform;
use rand::Rng;

use crate::error::{Error, Result};
use crate::keyed::WeightedChoice;
use crate::weight::Weight;

/// Draws a key from `container` with probability proportional to its
/// weight: `u <- uniform(0, total())`, then `container.choose(u)`.
///
/// This is the canonical algorithm for any sampler built on top of this
/// crate's contract.
///
/// # Errors
///
/// Returns `OutOfRange` if `container` is empty (`total() == 0`), since no
/// uniform draw over an empty interval is well-defined.
pub fn rand<R, C, K, T>(rng: &mut R, container: &mut C) -> Result<(K, T)>
where
    R: Rng + ?Sized,
    C: WeightedChoice<K, T>,
    T: Weight + SampleUniform,
    K: Clone,
{
    let total = container.total();
    if !(T::ZERO < total) {
        return Err(Error::OutOfRange);
    }
    let u = rng.random_range(T::ZERO..total);
    container.choose(u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::SegTree;
    use crate::keyed::KeyedRemoval;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    use test_log::test;

    #[test]
    fn rand_draws_from_nonempty_container() {
        let mut c: KeyedRemoval<SegTree<f64>, &'static str, f64> = KeyedRemoval::with_capacity(2);
        c.set("a", 1.0);
        c.set("b", 9.0);

        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        for _ in 0..50 {
            let (k, w) = rand(&mut rng, &mut c).unwrap();
            assert!(c.has(&k));
            assert_eq!(w, c.get(&k).unwrap());
        }
    }

    #[test]
    fn rand_rejects_empty_container() {
        let mut c: KeyedRemoval<SegTree<f64>, &'static str, f64> = KeyedRemoval::with_capacity(2);
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        assert_eq!(rand(&mut rng, &mut c), Err(Error::OutOfRange));
    }

    #[test]
    fn rand_converges_toward_weight_proportion() {
        let mut c: KeyedRemoval<SegTree<f64>, &'static str, f64> = KeyedRemoval::with_capacity(2);
        c.set("heavy", 9.0);
        c.set("light", 1.0);

        let mut rng = Xoshiro256StarStar::seed_from_u64(42);
        let mut heavy_hits = 0;
        let draws = 20_000;
        for _ in 0..draws {
            let (k, _) = rand(&mut rng, &mut c).unwrap();
            if k == "heavy" {
                heavy_hits += 1;
            }
        }
        let frac = f64::from(heavy_hits) / f64::from(draws);
        assert!((frac - 0.9).abs() < 0.02, "heavy fraction {frac} far from 0.9");
    }
}
