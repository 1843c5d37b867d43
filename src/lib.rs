// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A static, n-dimensional k-d tree spatial index over axis-aligned bounding
//! boxes.
//!
//! The tree is built once from a fixed set of `(id, bounds)` pairs and
//! answers overlap queries afterward; it never supports incremental insert,
//! update, or remove. Construction sweeps per-axis events ([`event`]) to
//! find, at every node, the minimum-cost axis and coordinate to split on
//! ([`build`]), storing the result in a compact three-array arena
//! ([`arena`]) of internal [`arena::Node`]s and [`arena::Leaf`]s. Queries
//! ([`query`]) descend that arena lazily, resolving each candidate's bounds
//! through a caller-supplied callback rather than owning the geometry
//! itself. [`persist`] reads and writes the arena's topology as text or
//! fixed-width binary.
//!
//! ```
//! use aabb_kdtree::{Aabb, Tree};
//!
//! let boxes = vec![
//!     Aabb::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap(),
//!     Aabb::new(vec![5.0, 5.0], vec![6.0, 6.0]).unwrap(),
//! ];
//! let tree = Tree::build(2, 4, &boxes).unwrap();
//!
//! let hits: Vec<i32> = tree
//!     .query(&[0.0, 0.0], &[2.0, 2.0], |id: i32, min: &mut [f64], max: &mut [f64]| {
//!         let b = &boxes[id as usize];
//!         min.copy_from_slice(&b.min);
//!         max.copy_from_slice(&b.max);
//!         Ok(())
//!     })
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(hits, vec![0]);
//! ```

mod arena;
mod build;
mod event;
mod persist;
mod query;
mod tree;
mod types;

pub use query::{BoundsFn, QueryIter};
pub use tree::Tree;
pub use types::{Aabb, ItemId, KdTreeError};
