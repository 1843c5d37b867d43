// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build-time event generation: turns item AABBs into per-axis sorted event
//! streams consumed by the splitter.

use crate::types::ItemId;

/// What an [`Event`] marks about an item's extent on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EventKind {
    /// The item's extent opens at this coordinate (nondegenerate interval).
    Open,
    /// The item is degenerate on this axis; one event covers it entirely.
    Point,
    /// The item's extent closes at this coordinate (nondegenerate interval).
    Close,
}

impl EventKind {
    /// Whether this event marks an item entering the sweep: Open or Point.
    #[inline]
    pub(crate) fn is_opening(self) -> bool {
        matches!(self, Self::Open | Self::Point)
    }

    /// Whether this event marks an item leaving the sweep: Close or Point.
    #[inline]
    pub(crate) fn is_closing(self) -> bool {
        matches!(self, Self::Close | Self::Point)
    }
}

/// A transient, build-time-only record of one item's extent on one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Event {
    /// The coordinate this event occurs at.
    pub(crate) x: f64,
    /// Whether this is an opening, point, or closing event.
    pub(crate) kind: EventKind,
    /// The item this event belongs to.
    pub(crate) item: ItemId,
}

/// Build the per-axis sorted event lists for a set of (id, aabb) pairs.
///
/// Returns one `Vec<Event>` per axis, each sorted ascending by `x`. Ties are
/// not broken further here; the splitter treats same-`x` runs as one group.
pub(crate) fn generate_events(dims: usize, boxes: &[(ItemId, crate::Aabb)]) -> Vec<Vec<Event>> {
    let mut axes: Vec<Vec<Event>> = (0..dims).map(|_| Vec::with_capacity(2 * boxes.len())).collect();
    for (id, aabb) in boxes {
        for (a, axis_events) in axes.iter_mut().enumerate() {
            let lo = aabb.min[a];
            let hi = aabb.max[a];
            if hi != lo {
                axis_events.push(Event { x: lo, kind: EventKind::Open, item: *id });
                axis_events.push(Event { x: hi, kind: EventKind::Close, item: *id });
            } else {
                axis_events.push(Event { x: lo, kind: EventKind::Point, item: *id });
            }
        }
    }
    for axis_events in &mut axes {
        axis_events.sort_by(|a, b| a.x.partial_cmp(&b.x).expect("coordinates must not be NaN"));
    }
    axes
}
