// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Weighted-sampling containers for continuous-time stochastic simulation
//! (Gillespie-family samplers).
//!
//! This crate answers one question at high throughput: given a mutable
//! collection of keyed nonnegative weights `{(k, w_k)}`, draw a key with
//! probability `w_k / Σw`, while supporting frequent insertions, deletions,
//! and in-place weight updates. It does not implement a sampler front-end
//! itself (direct-call, first-reaction, composition-rejection, ...) — those
//! are external collaborators built on top of the contract in
//! [`keyed::WeightedChoice`].
//!
//! # Layers
//!
//! - [`dense`] (L0): fixed-capacity, slot-indexed prefix sums — [`dense::SegTree`]
//!   (segment tree, O(log n) update/choose) and [`dense::CumSum`] (lazy
//!   cumulative sum, O(1) amortized update).
//! - [`keyed`] (L1/L2): turns a dense structure into a keyed map —
//!   [`keyed::KeyedRemoval`] and [`keyed::KeyedKeep`] wrap any L0 container;
//!   [`keyed::HashBuckets`] shards keys across many small inner containers
//!   under one outer segment tree.
//! - [`treap`] and [`sum_trie`] (L2): self-contained keyed prefix sums that
//!   don't need a separate dense layer — a randomized BST and a PATRICIA
//!   trie, respectively, both ordered by a 128-bit key ordinate.
//!
//! # Example
//!
//! ```
//! use weighted_choice::dense::SegTree;
//! use weighted_choice::keyed::{KeyedRemoval, WeightedChoice};
//!
//! let mut reactions: KeyedRemoval<SegTree<f64>, &str, f64> = KeyedRemoval::with_capacity(4);
//! reactions.set("A -> B", 2.0);
//! reactions.set("B -> C", 1.0);
//! assert_eq!(reactions.total(), 3.0);
//!
//! let (reaction, rate) = reactions.choose(2.5)?;
//! assert_eq!((reaction, rate), ("B -> C", 1.0));
//! # Ok::<(), weighted_choice::error::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod binary_search;
pub mod dense;
pub mod error;
mod hashing;
pub mod keyed;
pub mod samplers;
pub mod sum_trie;
pub mod treap;
pub mod weight;

pub use error::{Error, Result};
pub use keyed::WeightedChoice;
pub use weight::Weight;
