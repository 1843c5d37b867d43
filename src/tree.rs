// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The public facade: build a tree, run queries against it, and persist its
//! topology to text or binary.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::arena::Arena;
use crate::build::split;
use crate::event::generate_events;
use crate::persist::{binary, text};
use crate::query::{BoundsFn, QueryIter};
use crate::types::{Aabb, ItemId, KdTreeError};

/// A built, read-only n-dimensional k-d tree over axis-aligned bounding boxes.
///
/// A `Tree` owns only topology — split axes, split coordinates, and the ids
/// it was built over. It never owns the geometry those ids name; every query
/// resolves bounds on demand through a caller-supplied [`BoundsFn`].
#[derive(Clone, Debug)]
pub struct Tree {
    dims: usize,
    leaf_size: usize,
    arena: Arena,
    root: i32,
}

impl Tree {
    /// Build a tree over `boxes`, addressing each item by its position in
    /// the slice (`ItemId == index as i32`). This is index-mode addressing:
    /// a query's bounds callback can resolve an id straight back into
    /// `boxes[id as usize]` with no side table.
    pub fn build(dims: usize, leaf_size: usize, boxes: &[Aabb]) -> Result<Self, KdTreeError> {
        let items: Vec<(ItemId, Aabb)> = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (i as i32, b.clone()))
            .collect();
        Self::build_with_ids(dims, leaf_size, &items)
    }

    /// Build a tree over caller-chosen `(id, bounds)` pairs: object-mode
    /// addressing. Ids need not be contiguous or ordered, only resolvable by
    /// the bounds callback supplied at query time.
    pub fn build_with_ids(dims: usize, leaf_size: usize, items: &[(ItemId, Aabb)]) -> Result<Self, KdTreeError> {
        let leaf_size = leaf_size.max(1);
        for (_, b) in items {
            if b.dims() != dims {
                return Err(KdTreeError::DimensionMismatch { expected: dims, actual: b.dims() });
            }
        }

        let axes = generate_events(dims, items);
        let mut arena = Arena::with_capacity_hint(items.len(), leaf_size);
        let root = split(&mut arena, dims, leaf_size, axes, items.len())?;

        tracing::debug!(
            target: "aabb_kdtree",
            nodes = arena.node_count(),
            leaves = arena.leaf_count(),
            items = arena.item_count(),
            "built kd-tree"
        );

        Ok(Self { dims, leaf_size, arena, root })
    }

    /// The tree's configured dimensionality.
    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// The leaf-size threshold used during construction.
    #[inline]
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Number of internal split nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    /// Number of leaves.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.arena.leaf_count()
    }

    /// Number of stored item references. Every item lands in exactly one
    /// leaf, so this equals the count the tree was built over.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.arena.item_count()
    }

    /// Query all items whose bounds overlap `[min, max]`, resolved lazily
    /// through `bounds` as the descent reaches candidate leaves.
    pub fn query<'a, B: BoundsFn>(&'a self, min: &[f64], max: &[f64], bounds: B) -> Result<QueryIter<'a, B>, KdTreeError> {
        if min.len() != self.dims {
            return Err(KdTreeError::DimensionMismatch { expected: self.dims, actual: min.len() });
        }
        if max.len() != self.dims {
            return Err(KdTreeError::DimensionMismatch { expected: self.dims, actual: max.len() });
        }
        Ok(QueryIter::new(&self.arena, self.dims, self.root, min.to_vec(), max.to_vec(), bounds))
    }

    /// Write this tree's topology as tab-separated text.
    pub fn write_text<W: Write>(&self, w: &mut W) -> Result<(), KdTreeError> {
        text::write_text(w, &self.arena, self.root, self.dims, self.leaf_size)
    }

    /// Write this tree's topology to a text file at `path`.
    pub fn write_text_file(&self, path: impl AsRef<Path>) -> Result<(), KdTreeError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_text(&mut w)
    }

    /// Read a tree's topology back from tab-separated text.
    pub fn read_text<R: BufRead>(r: &mut R) -> Result<Self, KdTreeError> {
        let parsed = text::read_text(r)?;
        Ok(Self {
            dims: parsed.dims,
            leaf_size: parsed.leaf_size.max(1),
            arena: parsed.arena,
            root: parsed.root,
        })
    }

    /// Read a tree's topology back from a text file at `path`.
    pub fn read_text_file(path: impl AsRef<Path>) -> Result<Self, KdTreeError> {
        let mut r = BufReader::new(File::open(path)?);
        Self::read_text(&mut r)
    }

    /// Write this tree's topology as fixed-width binary to a file at `path`.
    pub fn write_binary_file(&self, path: impl AsRef<Path>) -> Result<(), KdTreeError> {
        let mut w = BufWriter::new(File::create(path)?);
        binary::write_binary(&mut w, &self.arena, self.dims, self.leaf_size)
    }

    /// Read a tree's topology back from a binary file at `path`, mapping the
    /// file with `memmap2` and fully materializing it before returning.
    ///
    /// The binary format doesn't persist a root reference directly: it is
    /// recovered from the arena's post-order invariant (root is the
    /// last-pushed node, or the sole leaf if construction never split).
    pub fn read_binary_file(path: impl AsRef<Path>) -> Result<Self, KdTreeError> {
        let parsed = binary::read_binary(path.as_ref())?;
        let root = if parsed.arena.node_count() == 0 {
            -1
        } else {
            i32::try_from(parsed.arena.node_count())
                .map_err(|_| KdTreeError::CapacityExceeded("node count exceeds i32 range"))?
                - 1
        };
        Ok(Self {
            dims: parsed.dims,
            leaf_size: parsed.leaf_size.max(1),
            arena: parsed.arena,
            root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_tree() -> (Tree, HashMap<ItemId, Aabb>) {
        let boxes: Vec<Aabb> = (0..40)
            .map(|i| {
                let x = f64::from(i);
                Aabb::new(vec![x, 0.0], vec![x + 0.9, 1.0]).unwrap()
            })
            .collect();
        let tree = Tree::build(2, 4, &boxes).unwrap();
        let map: HashMap<ItemId, Aabb> = boxes.into_iter().enumerate().map(|(i, b)| (i as i32, b)).collect();
        (tree, map)
    }

    #[test]
    fn index_mode_query_matches_brute_force() {
        let (tree, map) = sample_tree();
        let mut cb = |id: ItemId, min: &mut [f64], max: &mut [f64]| {
            let b = &map[&id];
            min.copy_from_slice(&b.min);
            max.copy_from_slice(&b.max);
            Ok(())
        };
        let mut found: Vec<ItemId> = tree
            .query(&[10.0, 0.0], &[12.0, 1.0], &mut cb)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        found.sort_unstable();

        let mut expected: Vec<ItemId> = map
            .iter()
            .filter(|(_, b)| b.overlaps(&Aabb::new(vec![10.0, 0.0], vec![12.0, 1.0]).unwrap()))
            .map(|(id, _)| *id)
            .collect();
        expected.sort_unstable();

        assert_eq!(found, expected);
    }

    #[test]
    fn query_rejects_wrong_dims() {
        let (tree, _map) = sample_tree();
        let cb = |_id: ItemId, _min: &mut [f64], _max: &mut [f64]| Ok(());
        let err = tree.query(&[0.0], &[1.0, 1.0], cb).unwrap_err();
        assert!(matches!(err, KdTreeError::DimensionMismatch { .. }));
    }

    #[test]
    fn object_mode_preserves_caller_ids() {
        let items = vec![
            (100, Aabb::new(vec![0.0], vec![1.0]).unwrap()),
            (200, Aabb::new(vec![5.0], vec![6.0]).unwrap()),
        ];
        let tree = Tree::build_with_ids(1, 1, &items).unwrap();
        let map: HashMap<ItemId, Aabb> = items.into_iter().collect();
        let mut cb = |id: ItemId, min: &mut [f64], max: &mut [f64]| {
            let b = &map[&id];
            min.copy_from_slice(&b.min);
            max.copy_from_slice(&b.max);
            Ok(())
        };
        let mut found: Vec<ItemId> = tree.query(&[0.0], &[1.0], &mut cb).unwrap().collect::<Result<Vec<_>, _>>().unwrap();
        found.sort_unstable();
        assert_eq!(found, vec![100]);
    }

    #[test]
    fn text_round_trip_preserves_query_behavior() {
        let (tree, map) = sample_tree();
        let mut buf = Vec::new();
        tree.write_text(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let loaded = Tree::read_text(&mut cursor).unwrap();

        assert_eq!(loaded.dims(), tree.dims());
        assert_eq!(loaded.node_count(), tree.node_count());
        assert_eq!(loaded.leaf_count(), tree.leaf_count());

        let mut cb = |id: ItemId, min: &mut [f64], max: &mut [f64]| {
            let b = &map[&id];
            min.copy_from_slice(&b.min);
            max.copy_from_slice(&b.max);
            Ok(())
        };
        let mut found: Vec<ItemId> = loaded
            .query(&[10.0, 0.0], &[12.0, 1.0], &mut cb)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        found.sort_unstable();
        assert_eq!(found, vec![10, 11, 12]);
    }

    #[test]
    fn binary_round_trip_via_tempfile() {
        let (tree, _map) = sample_tree();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.bin");
        tree.write_binary_file(&path).unwrap();
        let loaded = Tree::read_binary_file(&path).unwrap();
        assert_eq!(loaded.dims(), tree.dims());
        assert_eq!(loaded.leaf_size(), tree.leaf_size());
        assert_eq!(loaded.node_count(), tree.node_count());
        assert_eq!(loaded.leaf_count(), tree.leaf_count());
        assert_eq!(loaded.item_count(), tree.item_count());
    }

    #[test]
    fn single_leaf_tree_round_trips_through_binary() {
        let boxes = vec![Aabb::new(vec![0.0], vec![1.0]).unwrap()];
        let tree = Tree::build(1, 100, &boxes).unwrap();
        assert_eq!(tree.node_count(), 0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.bin");
        tree.write_binary_file(&path).unwrap();
        let loaded = Tree::read_binary_file(&path).unwrap();
        assert_eq!(loaded.item_count(), 1);
        let mut cb = |_id: ItemId, min: &mut [f64], max: &mut [f64]| {
            min[0] = 0.0;
            max[0] = 1.0;
            Ok(())
        };
        let found: Vec<ItemId> = loaded.query(&[0.0], &[1.0], &mut cb).unwrap().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(found, vec![0]);
    }
}
