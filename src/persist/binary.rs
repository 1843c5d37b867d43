// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-width binary persistence, written as three flat arrays (nodes,
//! leaves, items) in the arena's own post-order layout — children are always
//! pushed before their parent, so the root node is always `node_count - 1`.
//! Reads map the file with `memmap2` to avoid a buffered copy of the whole
//! file, then decode directly out of the mapping; the mapping is dropped as
//! soon as decoding finishes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::arena::{Arena, Leaf, Node};
use crate::types::KdTreeError;

const MAGIC: &[u8; 4] = b"AKD1";
const HEADER_LEN: usize = 4 + 4 + 4 + 4 + 4 + 4;
const NODE_RECORD_LEN: usize = 1 + 8 + 4 + 4 + 4;
const LEAF_RECORD_LEN: usize = 4 + 4;
const ITEM_RECORD_LEN: usize = 4;

pub(crate) fn write_binary<W: Write>(w: &mut W, arena: &Arena, dims: usize, leaf_size: usize) -> Result<(), KdTreeError> {
    w.write_all(MAGIC)?;
    w.write_all(&(dims as u32).to_le_bytes())?;
    w.write_all(&(leaf_size as u32).to_le_bytes())?;
    w.write_all(&(arena.node_count() as u32).to_le_bytes())?;
    w.write_all(&(arena.leaf_count() as u32).to_le_bytes())?;
    w.write_all(&(arena.item_count() as u32).to_le_bytes())?;

    for node in &arena.nodes {
        w.write_all(&[node.axis])?;
        w.write_all(&node.split.to_le_bytes())?;
        w.write_all(&node.low.to_le_bytes())?;
        w.write_all(&node.mid.to_le_bytes())?;
        w.write_all(&node.high.to_le_bytes())?;
    }
    for leaf in &arena.leaves {
        w.write_all(&leaf.first_item.to_le_bytes())?;
        w.write_all(&leaf.last_item.to_le_bytes())?;
    }
    for item in &arena.items {
        w.write_all(&item.to_le_bytes())?;
    }
    Ok(())
}

/// A decoded binary file's topology plus the envelope fields it declared.
#[derive(Debug)]
pub(crate) struct ParsedBinary {
    pub(crate) arena: Arena,
    pub(crate) dims: usize,
    pub(crate) leaf_size: usize,
}

pub(crate) fn read_binary(path: &Path) -> Result<ParsedBinary, KdTreeError> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only and fully decoded before this
    // function returns; we never hand out a reference that could observe a
    // concurrent write to the underlying file.
    #[allow(unsafe_code, reason = "memmap2::Mmap::map is inherently unsafe; scoped to this read")]
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    decode(&mmap)
}

fn decode(data: &[u8]) -> Result<ParsedBinary, KdTreeError> {
    if data.len() < HEADER_LEN || &data[0..4] != MAGIC {
        return Err(KdTreeError::Parse("bad binary header".into()));
    }
    let dims = read_u32(data, 4)? as usize;
    let leaf_size = read_u32(data, 8)? as usize;
    let node_count = read_u32(data, 12)? as usize;
    let leaf_count = read_u32(data, 16)? as usize;
    let item_count = read_u32(data, 20)? as usize;

    let mut offset = HEADER_LEN;
    let mut nodes = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        require_len(data, offset, NODE_RECORD_LEN)?;
        let axis = data[offset];
        let split = read_f64(data, offset + 1)?;
        let low = read_i32(data, offset + 9)?;
        let mid = read_i32(data, offset + 13)?;
        let high = read_i32(data, offset + 17)?;
        nodes.push(Node { axis, split, low, mid, high });
        offset += NODE_RECORD_LEN;
    }

    let mut leaves = Vec::with_capacity(leaf_count);
    for _ in 0..leaf_count {
        require_len(data, offset, LEAF_RECORD_LEN)?;
        let first_item = read_i32(data, offset)?;
        let last_item = read_i32(data, offset + 4)?;
        leaves.push(Leaf { first_item, last_item });
        offset += LEAF_RECORD_LEN;
    }

    let mut items = Vec::with_capacity(item_count);
    for _ in 0..item_count {
        require_len(data, offset, ITEM_RECORD_LEN)?;
        items.push(read_i32(data, offset)?);
        offset += ITEM_RECORD_LEN;
    }

    Ok(ParsedBinary { arena: Arena { nodes, leaves, items }, dims, leaf_size })
}

fn require_len(data: &[u8], offset: usize, len: usize) -> Result<(), KdTreeError> {
    if data.len() < offset + len {
        Err(KdTreeError::Parse("truncated binary file".into()))
    } else {
        Ok(())
    }
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, KdTreeError> {
    require_len(data, offset, 4)?;
    Ok(u32::from_le_bytes(data[offset..offset + 4].try_into().expect("length checked above")))
}

fn read_i32(data: &[u8], offset: usize) -> Result<i32, KdTreeError> {
    require_len(data, offset, 4)?;
    Ok(i32::from_le_bytes(data[offset..offset + 4].try_into().expect("length checked above")))
}

fn read_f64(data: &[u8], offset: usize) -> Result<f64, KdTreeError> {
    require_len(data, offset, 8)?;
    Ok(f64::from_le_bytes(data[offset..offset + 8].try_into().expect("length checked above")))
}
