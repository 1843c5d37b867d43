// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-role, contiguous storage for nodes, leaves, and the item-id run.
//!
//! Three parallel stores back a built tree: `nodes`, `leaves`, and `items`
//! (the flat concatenation of per-leaf item runs). A fourth, `events`, is
//! transient build-time scratch; this crate frees it by scope rather than by
//! an explicit call, since each per-axis event list is owned locally by the
//! builder recursion and drops when that call returns.
//!
//! Child references are signed: `r >= 0` is a node index, `r < 0` encodes
//! leaf index `-r - 1`. This matches the persisted binary layout and must be
//! preserved for on-disk compatibility (see [`crate::persist`]).

use crate::types::{ItemId, KdTreeError};

/// An internal split node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Node {
    /// The axis this node splits on, in `[0, dims)`.
    pub(crate) axis: u8,
    /// The split coordinate along `axis`.
    pub(crate) split: f64,
    /// Signed reference to the strictly-below child.
    pub(crate) low: i32,
    /// Signed reference to the straddles-the-plane child.
    pub(crate) mid: i32,
    /// Signed reference to the strictly-above child.
    pub(crate) high: i32,
}

/// A terminal node: an inclusive range into the arena's item-id run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Leaf {
    /// Index of the first item in this leaf's run (inclusive).
    pub(crate) first_item: i32,
    /// Index of the last item in this leaf's run (inclusive).
    pub(crate) last_item: i32,
}

/// Encode a node index as a non-negative signed arena reference.
#[inline]
pub(crate) fn encode_node_ref(idx: usize) -> Result<i32, KdTreeError> {
    i32::try_from(idx).map_err(|_| KdTreeError::CapacityExceeded("node index exceeds i32 range"))
}

/// Encode a leaf index as a negative signed arena reference.
#[inline]
pub(crate) fn encode_leaf_ref(idx: usize) -> Result<i32, KdTreeError> {
    let idx = i32::try_from(idx).map_err(|_| KdTreeError::CapacityExceeded("leaf index exceeds i32 range"))?;
    idx.checked_add(1)
        .map(|v| -v)
        .ok_or(KdTreeError::CapacityExceeded("leaf index exceeds i32 range"))
}

/// Decode a signed arena reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArenaRef {
    Node(usize),
    Leaf(usize),
}

#[inline]
pub(crate) fn decode_ref(r: i32) -> ArenaRef {
    if r >= 0 {
        ArenaRef::Node(r as usize)
    } else {
        ArenaRef::Leaf((-(r + 1)) as usize)
    }
}

/// Contiguous, post-build-immutable storage for a tree's topology.
#[derive(Clone, Debug, Default)]
pub(crate) struct Arena {
    pub(crate) nodes: Vec<Node>,
    pub(crate) leaves: Vec<Leaf>,
    pub(crate) items: Vec<ItemId>,
}

impl Arena {
    /// Preallocate with a `4 * ceil(item_count / leaf_size)` heuristic. This
    /// is a sizing hint only; all three stores still grow on demand past
    /// this guess rather than erroring.
    pub(crate) fn with_capacity_hint(item_count: usize, leaf_size: usize) -> Self {
        let leaf_size = leaf_size.max(1);
        let groups = item_count.div_ceil(leaf_size).max(1);
        Self {
            nodes: Vec::with_capacity(4 * groups),
            leaves: Vec::with_capacity(4 * groups),
            items: Vec::with_capacity(item_count),
        }
    }

    /// Append an internal node, returning its non-negative arena reference.
    pub(crate) fn push_node(&mut self, axis: u8, split: f64, low: i32, mid: i32, high: i32) -> Result<i32, KdTreeError> {
        let idx = self.nodes.len();
        let r = encode_node_ref(idx)?;
        self.nodes.push(Node { axis, split, low, mid, high });
        Ok(r)
    }

    /// Reserve `size` contiguous item slots and return the leaf's encoded
    /// reference along with the base offset to fill.
    pub(crate) fn push_leaf(&mut self, items: &[ItemId]) -> Result<i32, KdTreeError> {
        let first = i32::try_from(self.items.len()).map_err(|_| KdTreeError::CapacityExceeded("item run exceeds i32 range"))?;
        self.items.extend_from_slice(items);
        let last = first
            .checked_add(items.len() as i32 - 1)
            .ok_or(KdTreeError::CapacityExceeded("item run exceeds i32 range"))?;
        let leaf_idx = self.leaves.len();
        let r = encode_leaf_ref(leaf_idx)?;
        self.leaves.push(Leaf { first_item: first, last_item: last });
        Ok(r)
    }

    /// Number of internal nodes.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub(crate) fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Length of the flat item-id run.
    pub(crate) fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ref_roundtrips_as_nonnegative() {
        let r = encode_node_ref(7).unwrap();
        assert_eq!(r, 7);
        assert_eq!(decode_ref(r), ArenaRef::Node(7));
    }

    #[test]
    fn leaf_ref_roundtrips_as_negative() {
        let r = encode_leaf_ref(0).unwrap();
        assert_eq!(r, -1);
        assert_eq!(decode_ref(r), ArenaRef::Leaf(0));

        let r2 = encode_leaf_ref(5).unwrap();
        assert_eq!(r2, -6);
        assert_eq!(decode_ref(r2), ArenaRef::Leaf(5));
    }

    #[test]
    fn push_leaf_reserves_contiguous_run() {
        let mut arena = Arena::default();
        let r = arena.push_leaf(&[10, 11, 12]).unwrap();
        assert_eq!(decode_ref(r), ArenaRef::Leaf(0));
        let leaf = arena.leaves[0];
        assert_eq!(leaf.first_item, 0);
        assert_eq!(leaf.last_item, 2);
        assert_eq!(&arena.items[leaf.first_item as usize..=leaf.last_item as usize], &[10, 11, 12]);
    }

    #[test]
    fn disjoint_leaf_ranges_cover_item_run() {
        let mut arena = Arena::default();
        arena.push_leaf(&[1, 2]).unwrap();
        arena.push_leaf(&[3, 4, 5]).unwrap();
        assert_eq!(arena.leaves[0].first_item, 0);
        assert_eq!(arena.leaves[0].last_item, 1);
        assert_eq!(arena.leaves[1].first_item, 2);
        assert_eq!(arena.leaves[1].last_item, 4);
        assert_eq!(arena.item_count(), 5);
    }
}
