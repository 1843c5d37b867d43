// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The construction core: an event-sweep, SAH-like splitter that produces a
//! three-way (low / mid-straddles-plane / high) partition per internal node.

use std::collections::HashMap;

use crate::arena::Arena;
use crate::event::{Event, EventKind};
use crate::types::{ItemId, KdTreeError};

enum Side {
    Low,
    Mid,
    High,
}

/// `cost(L, M, H) = ((L+M)ln(L+M) + (M+H)ln(M+H)) / (L+M + M+H)`, with the
/// convention `0 * ln(0) = 0`. `M` deliberately counts into both halves:
/// mid-straddlers recurse into their own child, which partitions further.
fn cost(l: f64, m: f64, h: f64) -> f64 {
    let below = l + m;
    let above = m + h;
    let term = |v: f64| if v > 0.0 { v * v.ln() } else { 0.0 };
    let denom = below + above;
    if denom > 0.0 {
        (term(below) + term(above)) / denom
    } else {
        0.0
    }
}

struct BestSplit {
    axis: usize,
    x: f64,
    l: usize,
    m: usize,
    h: usize,
}

/// Sweep every axis's event list a tie-group at a time, tracking the
/// minimum-cost `(axis, x)` candidate and its `(L, M, H)` counts.
fn find_best_split(axes: &[Vec<Event>], n: usize) -> Option<BestSplit> {
    let mut best: Option<(f64, BestSplit)> = None;
    for (axis, events) in axes.iter().enumerate() {
        let (mut l, mut m, mut h) = (0i64, 0i64, n as i64);
        let mut i = 0;
        while i < events.len() {
            let x0 = events[i].x;
            let mut j = i;
            while j < events.len() && events[j].x == x0 {
                j += 1;
            }
            for e in &events[i..j] {
                if e.kind.is_opening() {
                    m += 1;
                    h -= 1;
                }
            }
            for e in &events[i..j] {
                if e.kind.is_closing() {
                    m -= 1;
                    l += 1;
                }
            }
            let c = cost(l as f64, m as f64, h as f64);
            if best.as_ref().is_none_or(|(bc, _)| c < *bc) {
                best = Some((
                    c,
                    BestSplit { axis, x: x0, l: l as usize, m: m as usize, h: h as usize },
                ));
            }
            i = j;
        }
    }
    best.map(|(_, b)| b)
}

/// Per-item `(min, max)` on one axis, read back from that axis's event list.
fn axis_item_ranges(events: &[Event]) -> HashMap<ItemId, (f64, f64)> {
    let mut ranges = HashMap::with_capacity(events.len());
    for e in events {
        match e.kind {
            EventKind::Point => {
                ranges.insert(e.item, (e.x, e.x));
            }
            EventKind::Open => {
                ranges.entry(e.item).or_insert((e.x, e.x)).0 = e.x;
            }
            EventKind::Close => {
                ranges.entry(e.item).or_insert((e.x, e.x)).1 = e.x;
            }
        }
    }
    ranges
}

fn classify(range: (f64, f64), split_x: f64) -> Side {
    let (lo, hi) = range;
    if hi <= split_x {
        Side::Low
    } else if lo > split_x {
        Side::High
    } else {
        Side::Mid
    }
}

fn partition(
    axes: Vec<Vec<Event>>,
    dims: usize,
    ranges: &HashMap<ItemId, (f64, f64)>,
    split_x: f64,
) -> (Vec<Vec<Event>>, Vec<Vec<Event>>, Vec<Vec<Event>>) {
    let mut low: Vec<Vec<Event>> = (0..dims).map(|_| Vec::new()).collect();
    let mut mid: Vec<Vec<Event>> = (0..dims).map(|_| Vec::new()).collect();
    let mut high: Vec<Vec<Event>> = (0..dims).map(|_| Vec::new()).collect();
    for (a, events) in axes.into_iter().enumerate() {
        for e in events {
            let range = ranges[&e.item];
            match classify(range, split_x) {
                Side::Low => low[a].push(e),
                Side::Mid => mid[a].push(e),
                Side::High => high[a].push(e),
            }
        }
    }
    (low, mid, high)
}

/// Emit a leaf from the ids of opening (open or point) events — exactly one
/// entry per distinct item in this event list's item set.
fn build_leaf(arena: &mut Arena, events: &[Event]) -> Result<i32, KdTreeError> {
    let ids: Vec<ItemId> = events.iter().filter(|e| e.kind.is_opening()).map(|e| e.item).collect();
    arena.push_leaf(&ids)
}

/// Recursively split `axes` (per-axis sorted event lists for `n` items) and
/// emit the resulting subtree into `arena`, returning its signed reference.
pub(crate) fn split(arena: &mut Arena, dims: usize, leaf_size: usize, axes: Vec<Vec<Event>>, n: usize) -> Result<i32, KdTreeError> {
    if n < leaf_size {
        return build_leaf(arena, &axes[0]);
    }

    let Some(best) = find_best_split(&axes, n) else {
        return build_leaf(arena, &axes[0]);
    };

    if best.l == n || best.m == n || best.h == n {
        // The candidate doesn't actually separate anything: every item
        // landed on one side (or all straddle the plane). Recursing would
        // hand the child the identical item set and loop forever.
        return build_leaf(arena, &axes[0]);
    }

    let ranges = axis_item_ranges(&axes[best.axis]);
    let (low_axes, mid_axes, high_axes) = partition(axes, dims, &ranges, best.x);

    let low_ref = split(arena, dims, leaf_size, low_axes, best.l)?;
    let high_ref = split(arena, dims, leaf_size, high_axes, best.h)?;
    let mid_ref = split(arena, dims, leaf_size, mid_axes, best.m)?;

    let axis_u8 = u8::try_from(best.axis).map_err(|_| KdTreeError::CapacityExceeded("dims exceeds u8 range"))?;
    arena.push_node(axis_u8, best.x, low_ref, mid_ref, high_ref)
}
