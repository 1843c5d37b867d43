// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The query engine: a lazy, explicit-stack descent that yields item ids
//! whose bounds overlap a query box, resolving each candidate's bounds
//! through a caller-supplied callback.

use crate::arena::{decode_ref, Arena, ArenaRef};
use crate::types::{ItemId, KdTreeError};

/// Resolves an item id back to its bounding box.
///
/// Implementations write into `min`/`max` (each of length `dims`) rather
/// than allocate, so a query can walk thousands of candidates without a
/// per-candidate heap allocation. This mirrors how the tree never owns the
/// objects it indexes: it stores ids, and the caller owns the geometry.
pub trait BoundsFn {
    /// Write `item`'s bounds into `min` and `max`, or fail.
    fn bounds(&mut self, item: ItemId, min: &mut [f64], max: &mut [f64]) -> Result<(), KdTreeError>;
}

impl<F> BoundsFn for F
where
    F: FnMut(ItemId, &mut [f64], &mut [f64]) -> Result<(), KdTreeError>,
{
    fn bounds(&mut self, item: ItemId, min: &mut [f64], max: &mut [f64]) -> Result<(), KdTreeError> {
        self(item, min, max)
    }
}

/// A lazy, depth-first query over a built tree.
///
/// Yields `Ok(item)` for every stored id whose bounds (as resolved by the
/// [`BoundsFn`]) overlap the query box, and short-circuits with `Err` the
/// first time the callback fails.
pub struct QueryIter<'a, B> {
    arena: &'a Arena,
    dims: usize,
    query_min: Vec<f64>,
    query_max: Vec<f64>,
    bounds: B,
    scratch_min: Vec<f64>,
    scratch_max: Vec<f64>,
    stack: Vec<i32>,
    pending: std::ops::Range<usize>,
    failed: bool,
}

impl<'a, B> std::fmt::Debug for QueryIter<'a, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIter")
            .field("dims", &self.dims)
            .field("query_min", &self.query_min)
            .field("query_max", &self.query_max)
            .field("stack", &self.stack)
            .field("pending", &self.pending)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<'a, B: BoundsFn> QueryIter<'a, B> {
    pub(crate) fn new(arena: &'a Arena, dims: usize, root: i32, query_min: Vec<f64>, query_max: Vec<f64>, bounds: B) -> Self {
        Self {
            arena,
            dims,
            query_min,
            query_max,
            bounds,
            scratch_min: vec![0.0; dims],
            scratch_max: vec![0.0; dims],
            stack: vec![root],
            pending: 0..0,
            failed: false,
        }
    }

    fn overlaps_query(&self) -> bool {
        (0..self.dims).all(|a| self.scratch_min[a] <= self.query_max[a] && self.scratch_max[a] >= self.query_min[a])
    }
}

impl<'a, B: BoundsFn> Iterator for QueryIter<'a, B> {
    type Item = Result<ItemId, KdTreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(idx) = self.pending.next() {
                let item = self.arena.items[idx];
                match self.bounds.bounds(item, &mut self.scratch_min, &mut self.scratch_max) {
                    Ok(()) => {
                        if self.overlaps_query() {
                            return Some(Ok(item));
                        }
                        continue;
                    }
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }

            let r = self.stack.pop()?;
            match decode_ref(r) {
                ArenaRef::Leaf(idx) => {
                    let leaf = self.arena.leaves[idx];
                    self.pending = if leaf.first_item <= leaf.last_item {
                        leaf.first_item as usize..(leaf.last_item as usize + 1)
                    } else {
                        0..0
                    };
                }
                ArenaRef::Node(idx) => {
                    let node = self.arena.nodes[idx];
                    let axis = node.axis as usize;
                    self.stack.push(node.mid);
                    if self.query_min[axis] <= node.split {
                        self.stack.push(node.low);
                    }
                    if self.query_max[axis] >= node.split {
                        self.stack.push(node.high);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::split;
    use crate::event::generate_events;
    use crate::Aabb;
    use std::collections::HashMap;

    fn build(boxes: &[(ItemId, Aabb)], dims: usize, leaf_size: usize) -> (Arena, i32) {
        let axes = generate_events(dims, boxes);
        let mut arena = Arena::with_capacity_hint(boxes.len(), leaf_size);
        let root = split(&mut arena, dims, leaf_size, axes, boxes.len()).unwrap();
        (arena, root)
    }

    fn lookup(boxes: &[(ItemId, Aabb)]) -> HashMap<ItemId, Aabb> {
        boxes.iter().cloned().collect()
    }

    #[test]
    fn finds_overlapping_items_only() {
        let boxes = vec![
            (1, Aabb::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap()),
            (2, Aabb::new(vec![5.0, 5.0], vec![6.0, 6.0]).unwrap()),
            (3, Aabb::new(vec![0.5, 0.5], vec![2.0, 2.0]).unwrap()),
        ];
        let (arena, root) = build(&boxes, 2, 1);
        let map = lookup(&boxes);
        let mut cb = |id: ItemId, min: &mut [f64], max: &mut [f64]| {
            let b = &map[&id];
            min.copy_from_slice(&b.min);
            max.copy_from_slice(&b.max);
            Ok(())
        };
        let mut hits: Vec<ItemId> = QueryIter::new(&arena, 2, root, vec![0.0, 0.0], vec![1.0, 1.0], &mut cb)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 3]);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let boxes: Vec<(ItemId, Aabb)> = Vec::new();
        let (arena, root) = build(&boxes, 2, 4);
        let mut cb = |_id: ItemId, _min: &mut [f64], _max: &mut [f64]| Ok(());
        let hits: Vec<_> = QueryIter::new(&arena, 2, root, vec![0.0, 0.0], vec![1.0, 1.0], &mut cb)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn callback_error_short_circuits() {
        let boxes = vec![(1, Aabb::new(vec![0.0], vec![1.0]).unwrap())];
        let (arena, root) = build(&boxes, 1, 1);
        let mut cb = |_id: ItemId, _min: &mut [f64], _max: &mut [f64]| Err(KdTreeError::Callback("boom".into()));
        let mut it = QueryIter::new(&arena, 1, root, vec![0.0], vec![1.0], &mut cb);
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
    }
}
