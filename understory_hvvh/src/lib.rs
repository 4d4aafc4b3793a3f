// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory HV/VH: a dynamic spatial index built from alternating binary splits and cut trees.
//!
//! The core is [`HvvhTree`], a binary spatial-partition tree whose levels alternate between
//! splitting on X and on Y. Leaves hold a small number of objects. When a leaf overflows it
//! splits at the midpoint of its members' bounding interval; objects straddling the split line
//! stay with the node in a secondary *cut tree* that splits on the orthogonal axis. Removing
//! objects merges every subtree that fits back into a single leaf, so the tree stays compact
//! under churn.
//!
//! - Objects are shared [`Indexable`] handles compared by identity. Each index keeps its own
//!   bookkeeping ([`SpatialAttribute`]) in a side table, so one object can sit in several
//!   indexes at once.
//! - Extents carry a [`CoordSys`] and are normalized to the tree's coordinate system on entry.
//!   Objects with an undefined [`Extent`] are tracked but never returned by bounded queries.
//! - Region queries are inclusive: touching edges overlap.
//!
//! ## Composition
//!
//! Every index implements [`ObjectIndex`], so indexes can be layered. [`RelativeIndex`] keeps
//! a bottom-to-top stacking order, and [`CombinedIndex`] runs a query through one index and
//! narrows it with another:
//!
//! ```rust
//! use understory_hvvh::{
//!     CombinedIndex, Extent, HvvhTree, ObjectIndex, Parameters, RelativeIndex, SearchCriteria,
//! };
//!
//! let mut index = CombinedIndex::new(RelativeIndex::new(), HvvhTree::new(Parameters::default()));
//! let a = index.add(Extent::world(0.0, 0.0, 10.0, 10.0)).unwrap();
//! let b = index.add(Extent::world(5.0, 5.0, 15.0, 15.0)).unwrap();
//! let _c = index.add(Extent::world(20.0, 20.0, 30.0, 30.0)).unwrap();
//!
//! let hits = index.query_indexables(&SearchCriteria::region(Extent::world(0.0, 0.0, 12.0, 12.0)), true);
//! assert_eq!(hits, vec![a, b]);
//! ```
//!
//! ## Logging
//!
//! Structural events go through the [`log`] facade: splits and merges at `trace`, cut-tree
//! creation and release at `debug`, and leaves forced over capacity by coincident extents at
//! `warn`. No logger is installed by this crate.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod combined;
mod contract;
mod cut;
mod error;
mod extent;
mod indexable;
mod relative;
mod slots;
mod tree;

pub use combined::CombinedIndex;
pub use contract::{Criterion, ObjectIndex, SearchCriteria};
pub use error::{IndexError, Violation};
pub use extent::{Axis, CoordSys, Extent, Interval, Spatial};
pub use indexable::{IndexId, Indexable};
pub use relative::RelativeIndex;
pub use slots::{NodeId, SpatialAttribute};
pub use tree::{HvvhTree, Parameters, TreeStats};
