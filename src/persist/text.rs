// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tab-separated, pre-order text persistence.
//!
//! Header: `<dims>\t<leaf_size>\t<node_count>\t<leaf_count>\t<item_count>\n`.
//! Then one pre-order walk of the tree: `N\t<axis>\t<split>\n` for an
//! internal node, followed by its low/mid/high subtrees in that order;
//! `L\t<count>\n` for a leaf, followed by `count` lines of one item id each.
//! Floats use Rust's default `Display`, which is the shortest string that
//! round-trips to the same `f64` — full precision without a fixed-width
//! format.

use std::io::{BufRead, Write};

use crate::arena::{decode_ref, Arena, ArenaRef};
use crate::types::KdTreeError;

pub(crate) fn write_text<W: Write>(w: &mut W, arena: &Arena, root: i32, dims: usize, leaf_size: usize) -> Result<(), KdTreeError> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}",
        dims,
        leaf_size,
        arena.node_count(),
        arena.leaf_count(),
        arena.item_count()
    )?;
    write_subtree(w, arena, root)
}

fn write_subtree<W: Write>(w: &mut W, arena: &Arena, r: i32) -> Result<(), KdTreeError> {
    match decode_ref(r) {
        ArenaRef::Node(idx) => {
            let node = arena.nodes[idx];
            writeln!(w, "N\t{}\t{}", node.axis, node.split)?;
            write_subtree(w, arena, node.low)?;
            write_subtree(w, arena, node.mid)?;
            write_subtree(w, arena, node.high)?;
            Ok(())
        }
        ArenaRef::Leaf(idx) => {
            let leaf = arena.leaves[idx];
            let items = if leaf.first_item <= leaf.last_item {
                &arena.items[leaf.first_item as usize..=leaf.last_item as usize]
            } else {
                &[][..]
            };
            writeln!(w, "L\t{}", items.len())?;
            for id in items {
                writeln!(w, "{id}")?;
            }
            Ok(())
        }
    }
}

/// Parsed topology plus the counts the header declared, so the caller can
/// cross-check them against the rebuilt arena.
#[derive(Debug)]
pub(crate) struct ParsedText {
    pub(crate) arena: Arena,
    pub(crate) root: i32,
    pub(crate) dims: usize,
    pub(crate) leaf_size: usize,
    pub(crate) declared_node_count: usize,
    pub(crate) declared_leaf_count: usize,
    pub(crate) declared_item_count: usize,
}

pub(crate) fn read_text<R: BufRead>(r: &mut R) -> Result<ParsedText, KdTreeError> {
    let mut lines = r.lines();
    let header = lines
        .next()
        .ok_or_else(|| KdTreeError::Parse("missing header line".into()))??;
    let mut parts = header.split('\t');
    let dims = parse_usize(parts.next(), "dims")?;
    let leaf_size = parse_usize(parts.next(), "leaf_size")?;
    let declared_node_count = parse_usize(parts.next(), "node_count")?;
    let declared_leaf_count = parse_usize(parts.next(), "leaf_count")?;
    let declared_item_count = parse_usize(parts.next(), "item_count")?;

    let mut arena = Arena::with_capacity_hint(declared_item_count, leaf_size.max(1));
    let root = read_subtree(&mut lines, &mut arena)?;

    Ok(ParsedText { arena, root, dims, leaf_size, declared_node_count, declared_leaf_count, declared_item_count })
}

fn parse_usize(field: Option<&str>, name: &'static str) -> Result<usize, KdTreeError> {
    field
        .ok_or_else(|| KdTreeError::Parse(format!("missing {name}")))?
        .parse()
        .map_err(|_| KdTreeError::Parse(format!("invalid {name}")))
}

fn next_line<R: BufRead>(lines: &mut std::io::Lines<&mut R>) -> Result<String, KdTreeError> {
    lines
        .next()
        .ok_or_else(|| KdTreeError::Parse("unexpected end of input".into()))?
        .map_err(KdTreeError::from)
}

fn read_subtree<R: BufRead>(lines: &mut std::io::Lines<&mut R>, arena: &mut Arena) -> Result<i32, KdTreeError> {
    let line = next_line(lines)?;
    let mut fields = line.split('\t');
    match fields.next() {
        Some("N") => {
            let axis: u8 = fields
                .next()
                .ok_or_else(|| KdTreeError::Parse("missing axis".into()))?
                .parse()
                .map_err(|_| KdTreeError::Parse("invalid axis".into()))?;
            let split: f64 = fields
                .next()
                .ok_or_else(|| KdTreeError::Parse("missing split".into()))?
                .parse()
                .map_err(|_| KdTreeError::Parse("invalid split".into()))?;
            let low = read_subtree(lines, arena)?;
            let mid = read_subtree(lines, arena)?;
            let high = read_subtree(lines, arena)?;
            arena.push_node(axis, split, low, mid, high)
        }
        Some("L") => {
            let count: usize = fields
                .next()
                .ok_or_else(|| KdTreeError::Parse("missing leaf item count".into()))?
                .parse()
                .map_err(|_| KdTreeError::Parse("invalid leaf item count".into()))?;
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                let id_line = next_line(lines)?;
                let id = id_line
                    .trim()
                    .parse()
                    .map_err(|_| KdTreeError::Parse("invalid item id".into()))?;
                ids.push(id);
            }
            arena.push_leaf(&ids)
        }
        _ => Err(KdTreeError::Parse("expected 'N' or 'L' record".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::split;
    use crate::event::generate_events;
    use crate::Aabb;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_text() {
        let boxes: Vec<_> = (0..9)
            .map(|i| {
                let x = f64::from(i);
                (i, Aabb::new(vec![x, 0.0], vec![x + 0.5, 1.0]).unwrap())
            })
            .collect();
        let axes = generate_events(2, &boxes);
        let mut arena = Arena::with_capacity_hint(boxes.len(), 2);
        let root = split(&mut arena, 2, 2, axes, boxes.len()).unwrap();

        let mut buf = Vec::new();
        write_text(&mut buf, &arena, root, 2, 2).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read_text(&mut cursor).unwrap();
        assert_eq!(parsed.dims, 2);
        assert_eq!(parsed.leaf_size, 2);
        assert_eq!(parsed.declared_node_count, arena.node_count());
        assert_eq!(parsed.declared_leaf_count, arena.leaf_count());
        assert_eq!(parsed.declared_item_count, arena.item_count());
        assert_eq!(parsed.arena.node_count(), arena.node_count());
        assert_eq!(parsed.arena.leaf_count(), arena.leaf_count());
        let mut original_items = arena.items.clone();
        let mut parsed_items = parsed.arena.items.clone();
        original_items.sort_unstable();
        parsed_items.sort_unstable();
        assert_eq!(original_items, parsed_items);
    }

    #[test]
    fn rejects_truncated_input() {
        let mut cursor = Cursor::new(b"2\t4\t1\t0\t0\n".to_vec());
        let err = read_text(&mut cursor).unwrap_err();
        assert!(matches!(err, KdTreeError::Parse(_)));
    }
}
