// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and the crate's error enum.

/// A caller-chosen item identifier.
///
/// The tree stores only these ids; it never owns the objects they name. A
/// [`crate::tree::BoundsFn`] translates an id back into its [`Aabb`] on demand.
pub type ItemId = i32;

/// An axis-aligned bounding box in `dims` dimensions.
///
/// Invariant: `min[a] <= max[a]` for every axis `a`. A point is represented
/// with `max == min`.
#[derive(Clone, Debug, PartialEq)]
pub struct Aabb {
    /// Per-axis minimum coordinates, length `dims`.
    pub min: Box<[f64]>,
    /// Per-axis maximum coordinates, length `dims`.
    pub max: Box<[f64]>,
}

impl Aabb {
    /// Build an AABB from owned min/max vectors, checking they agree in length.
    pub fn new(min: impl Into<Box<[f64]>>, max: impl Into<Box<[f64]>>) -> Result<Self, crate::KdTreeError> {
        let min = min.into();
        let max = max.into();
        if min.len() != max.len() {
            return Err(crate::KdTreeError::DimensionMismatch {
                expected: min.len(),
                actual: max.len(),
            });
        }
        Ok(Self { min, max })
    }

    /// The number of dimensions this AABB spans.
    #[inline]
    pub fn dims(&self) -> usize {
        self.min.len()
    }

    /// Whether this box is degenerate (a point) on every axis.
    #[inline]
    pub fn is_point(&self) -> bool {
        self.min.iter().zip(self.max.iter()).all(|(lo, hi)| lo == hi)
    }

    /// Axis-aligned overlap test: `self` and `other` intersect (inclusive of
    /// shared boundaries) on every axis.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        debug_assert_eq!(self.dims(), other.dims(), "overlap test requires equal dims");
        self.min
            .iter()
            .zip(self.max.iter())
            .zip(other.min.iter().zip(other.max.iter()))
            .all(|((lo, hi), (o_lo, o_hi))| *lo <= *o_hi && *hi >= *o_lo)
    }
}

/// All fatal conditions the crate can surface.
#[derive(Debug, thiserror::Error)]
pub enum KdTreeError {
    /// Building or loading a tree would exceed a preallocated or addressable
    /// arena limit.
    #[error("arena capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    /// A bounds vector's length differs from the tree's `dims`.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The tree's configured dimensionality.
        expected: usize,
        /// The length actually supplied.
        actual: usize,
    },

    /// A file read, write, or memory-map operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted text file was malformed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The caller-supplied bounds callback signaled failure.
    #[error("bounds callback error: {0}")]
    Callback(String),
}
